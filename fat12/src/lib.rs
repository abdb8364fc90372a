// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core FAT12 volume engine: on-disk layout, FAT codec, cluster allocation, directory
//! and file operations, and the image lifecycle that ties them together.

pub mod alloc;
pub mod dir_iter;
pub mod dir_ops;
pub mod fat;
pub mod file_ops;
pub mod image;
pub mod layout;
pub mod path;
pub mod region;

pub use fat12_err::{Error, Result};
pub use image::{Fat12Image, ImageSizeKb};

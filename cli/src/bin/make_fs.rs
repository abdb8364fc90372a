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

//! `make-fs <sizeKB> <imagePath>` — formats a fresh FAT12 image (§6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use fat12::{Fat12Image, ImageSizeKb};

#[derive(Parser)]
#[command(name = "make-fs", about = "Formats a new FAT12 image file")]
struct Args {
    /// Image size in kilobytes: 0.5 or 1.0
    size_kb: f64,
    /// Path of the image file to create
    image_path: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let size = match ImageSizeKb::from_kb(args.size_kb) {
        Ok(size) => size,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let image = match Fat12Image::format(args.image_path, size) {
        Ok(image) => image,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match image.flush() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

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

//! `fs-oper <imagePath> <op> [args...]` — operates on an existing FAT12 image (§6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;

use fat12::dir_ops::{list_dir, mkdir};
use fat12::file_ops::{chmod, dumpe2fs, read_file, write_file};
use fat12::Fat12Image;

#[derive(Parser)]
#[command(name = "fs-oper", about = "Operates on an existing FAT12 image")]
struct Args {
    image_path: PathBuf,
    #[command(subcommand)]
    op: Op,
}

#[derive(Subcommand)]
enum Op {
    Mkdir { path: String },
    Dir { path: String },
    Write { image_path: String, host_path: PathBuf },
    Read { image_path: String, host_path: PathBuf },
    Chmod { path: String, delta: String },
    Dumpe2fs,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(args) {
        error!("{err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(args: Args) -> fat12_err::Result<()> {
    let mut image = Fat12Image::load(args.image_path)?;

    match args.op {
        Op::Mkdir { path } => mkdir(&mut image, &path)?,
        Op::Dir { path } => {
            for entry in list_dir(&image, &path)? {
                println!("{}", entry.display_name());
            }
        }
        Op::Write { image_path, host_path } => {
            let content = fat12_storage::read_host_file(&host_path)?;
            let perm_bits = fat12_storage::host_permission_bits(&host_path)?;
            write_file(&mut image, &image_path, &content, perm_bits)?;
        }
        Op::Read { image_path, host_path } => {
            let content = read_file(&image, &image_path)?;
            fat12_storage::write_host_file(&host_path, &content)?;
        }
        Op::Chmod { path, delta } => chmod(&mut image, &path, &delta)?,
        Op::Dumpe2fs => {
            let dump = dumpe2fs(&image)?;
            println!("total bytes:      {}", dump.total_bytes);
            println!("block size:       {}", dump.block_size);
            println!("FAT1 start:       {}", dump.fat1_start);
            println!("FAT2 start:       {}", dump.fat2_start);
            println!("root dir start:   {}", dump.root_dir_start);
            println!("data area start:  {}", dump.data_area_start);
            println!("free clusters:    {}", dump.free_clusters);
            println!("used clusters:    {}", dump.used_clusters);
            println!("directories:      {}", dump.directory_count);
            println!("files:            {}", dump.file_count);
        }
    }

    image.flush()
}

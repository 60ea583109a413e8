/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use pendragon_asm::assemble;
use pendragon_asm::file_reader::{AsmFileReader, FileReader};

#[derive(ClapParser)]
#[clap(version = "0.1.0", author = "Connor Nolan")]
struct Opts {
    /// Source file to assemble.
    #[clap(short, long)]
    input: PathBuf,
    /// Where to write the assembled loader image.
    #[clap(short, long)]
    output: PathBuf,
    /// Program name embedded in the loader header; defaults to the input
    /// file's stem.
    #[clap(short, long)]
    name: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let reader = AsmFileReader;
    let source = reader.read_to_string(&opts.input).with_context(|| format!("reading {}", opts.input.display()))?;

    let program_name = opts.name.unwrap_or_else(|| {
        opts.input.file_stem().and_then(|s| s.to_str()).unwrap_or("program").to_string()
    });

    let image = assemble(&program_name, &source).with_context(|| format!("assembling {}", opts.input.display()))?;

    fs::write(&opts.output, &image).with_context(|| format!("writing {}", opts.output.display()))?;
    log::info!("assembled {} ({} bytes) -> {}", opts.input.display(), image.len(), opts.output.display());

    Ok(())
}

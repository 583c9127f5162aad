use std::io::{stdin, stdout, BufWriter};
use std::str::FromStr;

use anyhow::anyhow;
use bytesize::ByteSize;
use clap::{value_parser, Arg, ArgAction, Command};

use zstds::{CompressorOptions, DecompressorOptions, Dictionary};

fn parse_size(matches: &clap::ArgMatches, id: &str) -> anyhow::Result<usize> {
    match matches.get_one::<String>(id) {
        Some(size) => Ok(ByteSize::from_str(size).map_err(|e| anyhow!(e))?.0 as usize),
        None => Ok(0),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    eprintln!("zstd version: {}", zstds::library_version());

    let matches = Command::new("zstds")
        .arg(
            Arg::new("level")
                .short('l')
                .long("level")
                .value_parser(value_parser!(i32))
                .conflicts_with("decompress"),
        )
        .arg(
            Arg::new("decompress")
                .short('d')
                .long("decompress")
                .required(false)
                .action(ArgAction::SetTrue),
        )
        .arg(Arg::new("dictionary").short('D').long("dictionary"))
        .arg(Arg::new("source-buffer").long("source-buffer"))
        .arg(Arg::new("destination-buffer").long("destination-buffer"))
        .get_matches();

    let decompress = matches.get_flag("decompress");
    let source_buffer_length = parse_size(&matches, "source-buffer")?;
    let destination_buffer_length = parse_size(&matches, "destination-buffer")?;
    let dictionary = match matches.get_one::<String>("dictionary") {
        Some(path) => Some(Dictionary::new(std::fs::read(path)?)?),
        None => None,
    };

    let mut writer = BufWriter::new(stdout().lock());
    let mut reader = stdin().lock();

    if decompress {
        let options = DecompressorOptions {
            dictionary,
            source_buffer_length,
            destination_buffer_length,
            ..Default::default()
        };
        zstds::stream::decompress(&mut reader, &mut writer, &options)?;
    } else {
        let options = CompressorOptions {
            compression_level: matches.get_one::<i32>("level").copied(),
            dictionary,
            source_buffer_length,
            destination_buffer_length,
            ..Default::default()
        };
        zstds::stream::compress(&mut reader, &mut writer, &options)?;
    }
    Ok(())
}

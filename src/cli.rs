use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rangefile")]
#[command(version)]
#[command(about = "Read byte ranges of remote files without downloading them whole", long_about = None)]
#[command(after_help = "Examples:\n  \
  rangefile -o 1048576 -n 4096 https://example.com/disk.img   read 4 KiB at 1 MiB\n  \
  rangefile -n 512 -O header.bin https://example.com/a.tar    save the first 512 bytes\n  \
  rangefile -o 4096 /var/log/syslog                           works on local files too")]
pub struct Cli {
    /// HTTP(S) URL or local file path
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Byte offset to start reading from
    #[arg(short = 'o', long, value_name = "BYTES", default_value_t = 0)]
    pub offset: u64,

    /// Number of bytes to read (default: to the end of the resource)
    #[arg(short = 'n', long, value_name = "BYTES")]
    pub length: Option<u64>,

    /// Cache block size in bytes
    #[arg(short = 'b', long, value_name = "BYTES")]
    pub block_size: Option<u64>,

    /// Write output to FILE instead of stdout
    #[arg(short = 'O', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suppress transfer statistics
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }
}

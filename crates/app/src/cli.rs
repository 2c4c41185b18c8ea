//! 命令行参数定义。
//!
//! 所有参数均为可选，未给出的项依次回落到环境变量、配置文件与内置默认值。

use clap::Parser;
use std::path::PathBuf;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_FILE: &str = "barfetch.toml";

/// 期货历史 K 线批量抓取工具
#[derive(Debug, Clone, Parser)]
#[command(
    name = "barfetch",
    version,
    about = "Fetch historical futures bars into CSV / NinjaTrader files",
    after_help = "Examples:\n  \
barfetch -a ES,NQ -d 2024-01-02..2024-01-31 -s M1,S30 -k CSV,NINJA\n  \
barfetch -a ALL -d ALL --in-folders --save-to D:/bars"
)]
pub struct Cli {
    /// ALL or a comma list of symbols (e.g. ES,NQ,CL)
    #[arg(short, long)]
    pub assets: Option<String>,

    /// ALL, FROM..UNTIL, or a comma list of dates (yyyy-MM-dd or MM/dd/yyyy)
    #[arg(short, long)]
    pub dates: Option<String>,

    /// Comma list of output kinds: CSV, NINJA
    #[arg(short, long)]
    pub kinds: Option<String>,

    /// Comma list of bar sizes, up to ten (e.g. M1,S30)
    #[arg(short, long)]
    pub sizes: Option<String>,

    /// Settings file, missing file is ignored
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Nest output files under KIND/SIZE/SYMBOL/YEAR folders
    #[arg(long)]
    pub in_folders: bool,

    /// Root folder for bar files
    #[arg(long)]
    pub save_to: Option<String>,

    /// Folder for run logs
    #[arg(long)]
    pub log_to: Option<String>,

    #[arg(long)]
    pub user_name: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// Folder of recorded bar tapes replayed by the engine
    #[arg(long)]
    pub tape_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_short_flags() {
        let cli = Cli::try_parse_from([
            "barfetch", "-a", "ES,NQ", "-d", "2024-01-02..", "-k", "NINJA", "-s", "M1,S30",
        ])
        .unwrap();
        assert_eq!(cli.assets.as_deref(), Some("ES,NQ"));
        assert_eq!(cli.dates.as_deref(), Some("2024-01-02.."));
        assert_eq!(cli.kinds.as_deref(), Some("NINJA"));
        assert_eq!(cli.sizes.as_deref(), Some("M1,S30"));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(!cli.in_folders);
    }

    #[test]
    fn test_parse_long_flags() {
        let cli = Cli::try_parse_from([
            "barfetch",
            "--in-folders",
            "--save-to",
            "out",
            "--user-name",
            "trader",
            "--password",
            "secret",
            "--config",
            "other.toml",
        ])
        .unwrap();
        assert!(cli.in_folders);
        assert_eq!(cli.save_to.as_deref(), Some("out"));
        assert_eq!(cli.user_name.as_deref(), Some("trader"));
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(Cli::try_parse_from(["barfetch", "--bogus"]).is_err());
    }
}

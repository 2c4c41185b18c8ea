use crate::cli::Cli;
use crate::error::AppError;
use barfetch_core::config::RawSettings;
use config::{Config, Environment, File, FileFormat, Map};

/// 环境变量前缀，键与前缀之间以及嵌套键之间均以 `__` 分隔
pub const ENV_PREFIX: &str = "BARFETCH";
const ENV_SEPARATOR: &str = "__";

/// # Summary
/// 按优先级由低到高合并各配置来源，得到未经校验的原始配置。
///
/// # Logic
/// 1. 内置默认值（`RawSettings` 的 serde 默认）。
/// 2. 可选的 TOML 配置文件，缺失时忽略。
/// 3. `BARFETCH__` 前缀的环境变量。
/// 4. 命令行参数，仅覆盖显式给出的项。
///
/// # Arguments
/// * `cli`: 解析后的命令行参数。
/// * `env`: 环境变量来源，`None` 时读取进程环境。
pub fn load_raw(cli: &Cli, env: Option<Map<String, String>>) -> Result<RawSettings, AppError> {
    let mut builder = Config::builder()
        .add_source(
            File::from(cli.config.as_path())
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .source(env),
        )
        .set_override_option("assets", cli.assets.clone())?
        .set_override_option("dates", cli.dates.clone())?
        .set_override_option("kinds", cli.kinds.clone())?
        .set_override_option("sizes", cli.sizes.clone())?
        .set_override_option("save_to_path", cli.save_to.clone())?
        .set_override_option("log_file_path", cli.log_to.clone())?
        .set_override_option("user_name", cli.user_name.clone())?
        .set_override_option("password", cli.password.clone())?
        .set_override_option("tape_dir", cli.tape_dir.clone())?;

    // 开关参数只能打开，不能关闭文件中的设置
    if cli.in_folders {
        builder = builder.set_override("in_folders", true)?;
    }

    Ok(builder.build()?.try_deserialize()?)
}

/// 配置解析失败时打印的用法说明
pub const USAGE: &str = "\
Usage: barfetch [OPTIONS]

Settings are merged from barfetch.toml, BARFETCH__* environment variables
and the command line (highest precedence):

  assets         ALL | ES,NQ,...          (-a, --assets)
  dates          ALL | FROM..UNTIL | d1,d2  (-d, --dates; yyyy-MM-dd or MM/dd/yyyy)
  sizes          M1,S30,... up to ten     (-s, --sizes; default M1)
  kinds          CSV,NINJA                (-k, --kinds; default CSV)
  save_to_path   output folder            (--save-to; default bars)
  log_file_path  log folder               (--log-to; default logs)
  in_folders     nest output folders      (--in-folders)
  user_name      required                 (--user-name)
  password       required                 (--password)
  tape_dir       recorded tapes folder    (--tape-dir; default tape)
";

use barfetch_app::cli::Cli;
use barfetch_app::launcher;
use clap::Parser;

/// # Summary
/// 应用启动入口。
///
/// # Logic
/// 1. 解析命令行。
/// 2. 在运行时内完成抓取，日志守卫随 `run` 返回而释放并刷盘。
/// 3. 以退出码结束进程。
fn main() {
    let code = run();
    std::process::exit(code);
}

#[tokio::main]
async fn run() -> i32 {
    let cli = Cli::parse();
    launcher::run(cli).await.code()
}

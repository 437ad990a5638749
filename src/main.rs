use anyhow::Result;
use clap::{Arg, Command};

use vidqueue::common::{init_logging, parse_app_mode, start_application, StartupConfig};
use vidqueue_api::auth::{generate_api_key, hash_api_key};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("vidqueue")
        .version(env!("CARGO_PKG_VERSION"))
        .about("拉取式视频渲染任务分发服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时按默认路径查找"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("运行模式")
                .value_parser(["server", "worker", "keygen"])
                .default_value("server"),
        )
        .arg(
            Arg::new("worker-id")
                .long("worker-id")
                .value_name("ID")
                .help("Worker ID (仅在worker模式下使用)"),
        )
        .arg(
            Arg::new("server-url")
                .long("server-url")
                .value_name("URL")
                .help("分发服务地址 (仅在worker模式下使用)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
        .get_matches();

    let mode = matches
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("server");

    if mode == "keygen" {
        print_new_api_key();
        return Ok(());
    }

    let startup_config = StartupConfig {
        config_path: matches.get_one::<String>("config").cloned(),
        log_level: matches
            .get_one::<String>("log-level")
            .cloned()
            .unwrap_or_else(|| "info".to_string()),
        log_format: matches
            .get_one::<String>("log-format")
            .cloned()
            .unwrap_or_else(|| "pretty".to_string()),
        worker_id: matches.get_one::<String>("worker-id").cloned(),
        server_url: matches.get_one::<String>("server-url").cloned(),
    };

    init_logging(&startup_config.log_level, &startup_config.log_format)?;
    let app_mode = parse_app_mode(mode)?;
    start_application(startup_config, app_mode).await
}

/// 输出新密钥及其在配置文件中的写法
fn print_new_api_key() {
    let key = generate_api_key();
    let hash = hash_api_key(&key);
    println!("API密钥（仅显示一次）: {key}");
    println!();
    println!("[api.auth.api_keys.\"{hash}\"]");
    println!("name = \"<名称>\"");
    println!("permissions = [\"Submit\"]");
}

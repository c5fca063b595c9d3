use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vddkflow::plugin;
use vddkflow_config::Settings;

#[derive(Parser)]
#[command(name = "vddkflow")]
#[command(about = "VDDK tarball upload and OpenShift image build service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// HTTP サーバーを起動
    Serve {
        /// 設定ファイルのパス（未指定時は VDDKFLOW_CONFIG_PATH、カレント、~/.config の順に探す）
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// 待ち受けアドレス
        #[arg(short, long, env = "VDDKFLOW_LISTEN")]
        listen: Option<String>,
        /// アップロード先ディレクトリ
        #[arg(long)]
        upload_dir: Option<PathBuf>,
        /// ビルド受付後に次の受付を拒否する秒数
        #[arg(long)]
        lease_seconds: Option<u64>,
    },
    /// ESX 側 clone プラグインを実行
    Clone {
        /// コピー元のディスクパス
        #[arg(long)]
        source: String,
        /// コピー先のデバイスパス
        #[arg(long)]
        target: String,
        /// ラッパースクリプト（未指定時は設定の plugin.clone_script）
        #[arg(long)]
        script: Option<PathBuf>,
        /// 設定ファイルのパス
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

fn load_settings(config: Option<&std::path::Path>) -> anyhow::Result<Settings> {
    Ok(vddkflow_config::load(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout は clone の JSON 出力に使うので、ログは stderr へ
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Version => {
            println!("vddkflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Serve {
            config,
            listen,
            upload_dir,
            lease_seconds,
        } => {
            let mut settings = match load_settings(config.as_deref()) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("{} {}", "設定の読み込みに失敗しました:".red(), e);
                    return Err(e);
                }
            };

            // CLI フラグはファイルの値より優先
            if let Some(listen) = listen {
                settings.listen = listen;
            }
            if let Some(upload_dir) = upload_dir {
                settings.upload_dir = upload_dir;
            }
            if let Some(lease_seconds) = lease_seconds {
                settings.lease_seconds = lease_seconds;
            }
            settings.validate()?;

            vddkflow::serve(settings).await?;
        }
        Commands::Clone {
            source,
            target,
            script,
            config,
        } => {
            let script = match script {
                Some(script) => script,
                None => load_settings(config.as_deref())?.plugin.clone_script,
            };

            let outcome = plugin::run_clone(&script, &source, &target).await;
            println!("{}", outcome.to_json());
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
mod config;
mod error;
mod events;
mod keybinding;
pub mod mappings;
mod services;
mod shortcuts;
mod utils;

use config::Config;
use services::{create_display, KeybindingEngine, WindowManager};
use shortcuts::{History, Rules};

// Очередь событий X сервера к главной задаче
const EVENT_QUEUE: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "xatk")]
#[command(about = "Назначает окнам X11 клавиатурные ярлыки и переключает окна по ним")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "xatk.toml")]
    config: PathBuf,

    /// X дисплей, например :0 (по умолчанию $DISPLAY)
    #[arg(short, long)]
    display: Option<String>,

    /// Режим сухого запуска: X сервер эмулируется в памяти
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    /// Вывести конфигурацию по умолчанию и выйти
    #[arg(short, long)]
    print_defaults: bool,

    /// Вывести имена клавиш клавиатуры и выйти
    #[arg(short = 'k', long)]
    print_keys: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_defaults {
        print!("{}", Config::default_toml()?);
        return Ok(());
    }

    let config = Arc::new(Config::load_or_create(&args.config)?);

    // Инициализация системы логирования
    init_tracing(args.log_level.as_deref().unwrap_or(&config.logging.level))?;

    info!("Запуск xatk v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {:?}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - X сервер эмулируется");
    }

    let (display, event_source) = create_display(args.display.as_deref(), args.dry_run)?;

    if args.print_keys {
        for name in display.key_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let history_path = config.history_path(&args.config);
    let history = History::load(&history_path, config.history.length)?;
    if history.is_empty() {
        info!("История пуста: {:?}", history_path);
    } else {
        info!("История загружена из {:?}: записей {}", history_path, history.len());
    }
    let rules = Rules::compile(&config.rules)?;
    info!("Правил AWN: {}", rules.len());

    let engine = KeybindingEngine::new(display);
    let mut manager = WindowManager::new(config.clone(), engine, rules, history)?;
    manager.start()?;

    let (tx, mut rx) = mpsc::channel(EVENT_QUEUE);
    let mut source_handle = tokio::spawn(async move { event_source.run(tx).await });

    let mut sigterm = unix_signal(SignalKind::terminate())?;
    let mut sigusr1 = unix_signal(SignalKind::user_defined1())?;
    let mut sighup = unix_signal(SignalKind::hangup())?;

    info!("Все компоненты инициализированы, ожидание событий");

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    // Поток событий закрывается только при потере соединения
                    match (&mut source_handle).await {
                        Ok(Err(e)) => error!("Источник событий остановлен: {}", e),
                        Err(e) => error!("Задача источника событий аварийно завершена: {}", e),
                        Ok(Ok(())) => error!("Источник событий остановлен"),
                    }
                    manager.save_history();
                    bail!("Соединение с X сервером потеряно");
                };
                if let Err(e) = manager.handle_event(event) {
                    if e.is_fatal() {
                        error!("Фатальная ошибка: {}", e);
                        manager.save_history();
                        return Err(e.into());
                    }
                    warn!("Ошибка обработки события: {}", e);
                }
            }
            _ = signal::ctrl_c() => {
                info!("Получен сигнал завершения (Ctrl+C)");
                break;
            }
            _ = sigterm.recv() => {
                info!("Получен сигнал SIGTERM");
                break;
            }
            _ = sigusr1.recv() => {
                info!("Получен SIGUSR1: запись истории");
                manager.save_history();
            }
            _ = sighup.recv() => {
                debug!("SIGHUP игнорируется");
            }
        }
    }

    info!("Завершение работы...");
    if let Err(e) = manager.shutdown() {
        warn!("Не удалось освободить все сочетания: {}", e);
    }
    source_handle.abort();

    info!("xatk завершил работу");
    // Поток событий X11 остаётся заблокирован в ожидании события:
    // не ждём его при остановке рантайма
    std::process::exit(0);
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}

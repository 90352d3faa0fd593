use workchat_common::db::create_db_thread_pool;
use workchat_common::email::senders::{MockSender, SmtpSender};
use workchat_common::email::{EmailSender, Letterhead};
use workchat_common::token::key_cache::{FileKeySource, VerifyingKeyCache};

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, Naming, WriteMode,
};

mod env;
mod handlers;
mod middleware;
mod relay;
mod services;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut port = 9000u16;

    let mut args = std::env::args();

    // Eat the first argument, which is the relative path to the executable
    args.next();

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--port" => {
                let Some(port_str) = args.next() else {
                    eprintln!("ERROR: --port option specified but no port was given");
                    std::process::exit(1);
                };

                port = match port_str.parse::<u16>() {
                    Ok(p) => p,
                    Err(_) => {
                        eprintln!("ERROR: Incorrect format for port. Integer expected");
                        std::process::exit(1);
                    }
                };
            }
            a => {
                eprintln!("ERROR: Invalid argument: {}", &a);
                std::process::exit(1);
            }
        }
    }

    let log_spec =
        LogSpecification::parse(&env::CONF.log_level).unwrap_or(LogSpecification::info());

    let _logger = Logger::with(log_spec)
        .log_to_file(FileSpec::default().directory("./logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start()
        .expect("Failed to start logger");

    log::info!("Connecting to database...");

    // To prevent resource starvation, max connections must be at least as large as the number of
    // actix workers
    let db_max_connections = env::CONF
        .db_max_connections
        .max(env::CONF.actix_worker_count as u32);

    let db_thread_pool = create_db_thread_pool(
        &env::CONF.database_uri(),
        db_max_connections,
        env::CONF.db_idle_timeout,
    );

    log::info!("Successfully connected to database");

    let smtp_thread_pool: EmailSender = if env::CONF.email_enabled {
        log::info!("Connecting to SMTP relay...");

        let smtp_thread_pool = SmtpSender::with_credentials(
            &env::CONF.smtp_username,
            &env::CONF.smtp_password,
            &env::CONF.smtp_address,
            env::CONF.max_smtp_connections,
            env::CONF.smtp_idle_timeout,
            Letterhead {
                from: env::CONF.email_from_address.clone(),
                reply_to: env::CONF.email_reply_to_address.clone(),
            },
        )
        .expect("Failed to connect to SMTP relay");

        match smtp_thread_pool.test_connection().await {
            Ok(true) => (),
            Ok(false) => panic!("Failed to connect to SMTP relay"),
            Err(e) => panic!("Failed to connect to SMTP relay: {e}"),
        }

        log::info!("Successfully connected to SMTP relay");

        Box::new(smtp_thread_pool)
    } else {
        log::info!("Emails are disabled. Using mock SMTP thread pool.");
        Box::new(MockSender::new())
    };

    let smtp_thread_pool = Data::new(smtp_thread_pool);
    let key_cache = Data::new(VerifyingKeyCache::new(
        Box::new(FileKeySource::new(env::CONF.token_verifying_key_path.as_str())),
        env::CONF.verifying_key_cache_ttl,
    ));
    let connections = Data::new(relay::ConnectionRegistry::new());

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(db_thread_pool.clone()))
            .app_data(smtp_thread_pool.clone())
            .app_data(key_cache.clone())
            .app_data(connections.clone())
            .configure(services::api::configure)
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(env::CONF.actix_worker_count)
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    // Safe because all other threads have been joined
    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}

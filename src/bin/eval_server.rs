use std::env;

use actix_web::{App, HttpServer};
use alphasim::http::server::{evaluate, indicators};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let address: String = args.get(1).cloned().unwrap_or_else(|| "127.0.0.1".into());
    let port: u16 = args
        .get(2)
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    HttpServer::new(move || App::new().service(evaluate).service(indicators))
        .bind((address, port))?
        .run()
        .await
}

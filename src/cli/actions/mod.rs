pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        cache_url: String,
    },
}

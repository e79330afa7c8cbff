use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(name = "filmorate-server", version, about = "Films, users, likes and friends over HTTP")]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "FILMORATE_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "FILMORATE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Which storage backing to use
    #[arg(long, env = "FILMORATE_STORAGE", value_enum, default_value_t = Backend::Sqlite)]
    pub storage: Backend,

    /// SQLite database file, or `:memory:` for a transient database
    #[arg(long, env = "FILMORATE_DATABASE", default_value = "filmorate.db")]
    pub database: PathBuf,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Process-local maps, lost on restart
    Memory,
    /// Relational tables in SQLite
    Sqlite,
}

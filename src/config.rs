use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

/// Runtime configuration. Every field has a hard default matching the
/// paths the operational scripts were written against; env vars override.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
    pub graph_path: PathBuf,
    pub smoke_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".into())
            .parse()
            .unwrap_or_else(|_| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));

        let model_path = PathBuf::from(
            env::var("MODEL_PATH").unwrap_or_else(|_| "models/diabetes_model.json".to_string()),
        );
        let metadata_path = PathBuf::from(
            env::var("METADATA_PATH")
                .unwrap_or_else(|_| "models/model_metadata.json".to_string()),
        );
        let graph_path = PathBuf::from(
            env::var("GRAPH_PATH")
                .unwrap_or_else(|_| "assets/models/diabetes_model.graph.json".to_string()),
        );

        let smoke_base_url = env::var("API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        Ok(Self {
            listen_addr,
            model_path,
            metadata_path,
            graph_path,
            smoke_base_url,
        })
    }
}

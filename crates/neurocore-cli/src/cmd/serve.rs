use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>, no_open: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let port = port.unwrap_or(config.server.port);
    let root = root.to_path_buf();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual_port = listener.local_addr()?.port();
        println!("NeuroCore API → http://localhost:{actual_port}/api  (PID {})", std::process::id());

        tokio::select! {
            res = neurocore_server::serve_on(root, listener, !no_open) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stand-alone render gate in front of an origin application.
//!
//! Honours RENDERGATE_CONFIG_FILE or falls back to /etc/rendergate/config.toml;
//! without either file the configuration comes from the environment alone.

use rendergate::{RenderProxy, error_fmt, info_fmt};
use std::env;
use std::error::Error;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "/etc/rendergate/config.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("Starting rendergate");

    let mut loader = RenderProxy::loader().with_env_vars();
    match env::var("RENDERGATE_CONFIG_FILE").ok() {
        Some(path) => {
            println!("Using configuration from {path}");
            loader = loader.with_config_file(&path);
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            println!("Using configuration from {DEFAULT_CONFIG_PATH}");
            loader = loader.with_config_file(DEFAULT_CONFIG_PATH);
        }
        None => {
            println!("No configuration file found, reading configuration from the environment");
        }
    }

    let proxy = match loader.build().await {
        Ok(proxy) => proxy,
        Err(e) => {
            println!("Failed to build rendergate: {e}");
            return Err(e.into());
        }
    };

    if let Err(e) = proxy.start().await {
        error_fmt!("Startup", "Server failed: {}", e);
        return Err(e.into());
    }

    info_fmt!("Startup", "Server stopped gracefully");
    Ok(())
}

// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

use crate::USER_AGENT;
use log::error;
use rustls::ClientConfig;
use rustls_platform_verifier::ConfigVerifierExt;
use std::sync::Arc;
use std::time::Duration;

/// Create the HTTP client for the cloud API.
///
/// Server certificates are verified with the platform verifier. If the platform verifier can't be
/// initialized, the default awc connector is used.
pub fn new_http_client(request_timeout: Duration) -> awc::Client {
    let builder = awc::ClientBuilder::new()
        .timeout(request_timeout)
        .add_default_header(("User-Agent", USER_AGENT));

    match ClientConfig::with_platform_verifier() {
        Ok(mut config) => {
            // the cloud API is only used with http/1.1
            config.alpn_protocols = vec![b"http/1.1".to_vec()];
            let connector = awc::Connector::new()
                .timeout(request_timeout)
                .rustls_0_23(Arc::new(config));
            builder.connector(connector).finish()
        }
        Err(e) => {
            error!("Platform certificate verifier not available, using default TLS config: {e}");
            builder.finish()
        }
    }
}

//! `switchboard-server`: a single configurable demo binary that serves one
//! of the bundled demo protocols, selected with `--protocol`.

#[path = "common.rs"]
mod common;

use switchboard::config::Protocol;
use switchboard::protocols::{echo::Echo, httpish::HttpIsh, mirror_delimited::MirrorDelimited, mirror_fixed::MirrorFixed, reqresp::ReqResp};

fn main() {
    let config = common::parse_config();
    common::init_tracing(&config);

    match config.protocol {
        Protocol::Echo => common::run_with(&config, "echo", Echo::default),
        Protocol::MirrorFixed => common::run_with(&config, "mirror-fixed", MirrorFixed::default),
        Protocol::MirrorDelimited => {
            common::run_with(&config, "mirror-delimited", MirrorDelimited::default)
        }
        Protocol::HttpIsh => common::run_with(&config, "httpish", HttpIsh::default),
        Protocol::ReqResp => common::run_with(&config, "reqresp", ReqResp::default),
    }
}

#[path = "common.rs"]
mod common;

use switchboard::protocols::httpish::HttpIsh;

fn main() {
    common::run_demo("httpish", HttpIsh::default);
}

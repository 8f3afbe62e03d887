#[path = "common.rs"]
mod common;

use switchboard::protocols::mirror_delimited::MirrorDelimited;

fn main() {
    common::run_demo("mirror-delimited", MirrorDelimited::default);
}

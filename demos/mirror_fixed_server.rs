#[path = "common.rs"]
mod common;

use switchboard::protocols::mirror_fixed::MirrorFixed;

fn main() {
    common::run_demo("mirror-fixed", MirrorFixed::default);
}

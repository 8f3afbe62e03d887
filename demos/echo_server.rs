#[path = "common.rs"]
mod common;

use switchboard::protocols::echo::Echo;

fn main() {
    common::run_demo("echo", Echo::default);
}

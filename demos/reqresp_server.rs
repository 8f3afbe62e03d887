#[path = "common.rs"]
mod common;

use switchboard::protocols::reqresp::ReqResp;

fn main() {
    common::run_demo("reqresp", ReqResp::default);
}

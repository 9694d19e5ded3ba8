//! boot_done - signal the host that the guest booted, then exec init

use std::{env, process};

use guest_boot::{consts, logging, run, signal};

fn main() {
    logging::init();
    let code = run(signal::platform_signal(), consts::INIT_PATH, env::args_os());
    process::exit(code)
}

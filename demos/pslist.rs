use std::rc::Rc;

use memscope::{
    Config, Hex,
    driver::raw::FileSpace,
    os::windows::{WindowsKernel, plugins, xp_sp2_x86},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let path = std::env::args().nth(1).ok_or("usage: pslist <image>")?;

    // Setup the physical address space.
    let physical = Rc::new(FileSpace::open(&path)?);

    // Find the kernel. Without a configured DTB, the image is scanned for
    // the idle process.
    let profile = xp_sp2_x86(Config::default());
    let kernel = WindowsKernel::from_physical(profile, physical)?;

    tracing::info!(kdbg = ?kernel.kdbg().map(|kdbg| Hex(kdbg.offset())), "kernel found");

    for process in plugins::pslist(&kernel)? {
        println!(
            "{} {:<16} {:>6} {:>6} {:>4} {}",
            Hex(process.offset),
            process.name.as_deref().unwrap_or("-"),
            process.pid.map_or_else(|| String::from("-"), |pid| pid.to_string()),
            process.ppid.map_or_else(|| String::from("-"), |pid| pid.to_string()),
            process.threads.map_or_else(|| String::from("-"), |threads| threads.to_string()),
            process.create_time.map_or_else(|| String::from("-"), |time| time.to_string()),
        );
    }

    Ok(())
}

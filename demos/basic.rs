use tracing::{debug, error, info, warn};

use tracing_extras_fmt::init::init;

#[tracing::instrument]
fn charge(order_id: u64) {
    // WARN ../demos/basic.rs:charge:8 card declined, retrying # {"card":"visa","sth":"ohoho"}
    warn!(card = "visa", "card declined, retrying");
    // ERROR ../demos/basic.rs:charge:10 charge failed # {"reason":"insufficient funds","sth":"ohoho"}
    error!(reason = "insufficient funds", "charge failed");
}

fn main() {
    init();

    // Outside any span the function renders as `<module>`:
    // INFO ../demos/basic.rs:<module>:18 service started # {"sth":"ohoho"}
    info!("service started");
    // DEBUG ../demos/basic.rs:<module>:20 Some error # {"d":"abc","sth":"ohoho"}
    debug!(d = "abc", "Some error");

    // Inside a span it renders as the span's name; `#[instrument]` names it after the function.
    charge(123);
    {
        let _main = tracing::info_span!("main").entered();
        // INFO ../demos/basic.rs:main:27 inside main # {"sth":"ohoho"}
        info!("inside main");
    }

    // Bridged `log` records keep their file and line but have no function:
    // INFO ../demos/basic.rs:<unknown>:32 legacy dependency says hi # {"sth":"ohoho"}
    log::info!("legacy dependency says hi");
}

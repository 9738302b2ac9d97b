use std::time::Duration;
use wirestub::{Server, STARTED};

fn main() {
    env_logger::init();

    let mut s = Server::start(8089).unwrap_or_else(|_| Server::new_with_opts(Default::default()));

    s.stub("GET", "/todo")
        .in_scenario("todo list")
        .when_scenario_state_is(STARTED)
        .will_set_state_to("item added")
        .with_body("[]")
        .create();
    s.stub("GET", "/todo")
        .in_scenario("todo list")
        .when_scenario_state_is("item added")
        .will_set_state_to(STARTED)
        .with_header("content-type", "application/json")
        .with_body("[\"buy milk\"]")
        .create();

    println!("Listening on {}", s.url());

    loop {
        std::thread::sleep(Duration::from_secs(1))
    }
}

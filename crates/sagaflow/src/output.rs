use sagaflow_operations::handler::Invocation;
use sagaflow_saga::State;
use serde::Serialize;

pub(crate) fn print_invocation<D: Serialize>(invocation: &Invocation<D>) {
    let outcome = match invocation {
        Invocation::Completed(_) => "completed",
        Invocation::Suspended(_) => "suspended",
        Invocation::Accepted(_) => "accepted",
    };
    let state = invocation.state();
    println!(
        "Run {} of saga '{}' {outcome} ({})",
        state.id(),
        state.name(),
        state.status()
    );
    print_details(state);
}

pub(crate) fn print_state<D: Serialize>(state: &State<D>) {
    println!("Run {} of saga '{}': {}", state.id(), state.name(), state.status());
    println!("Started: {}", state.start_time().to_rfc3339());
    println!("Updated: {}", state.last_time().to_rfc3339());
    print_details(state);
}

fn print_details<D: Serialize>(state: &State<D>) {
    println!();
    println!("Steps:");
    for line in state.summary().lines() {
        println!("  {line}");
    }

    if let Some(error) = state.error() {
        println!();
        match &error.cause {
            Some(cause) => println!("Error: {error} ({cause})"),
            None => println!("Error: {error}"),
        }
    }

    if let Ok(payload) = serde_json::to_string_pretty(state.payload()) {
        println!();
        println!("Payload:");
        println!("{payload}");
    }
}

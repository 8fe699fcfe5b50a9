//! Printing decoded events.

use anyhow::Result;
use chainbind_core::DecodedEvent;

pub fn print_event(ev: &DecodedEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(ev)?);
        return Ok(());
    }

    let fields = ev
        .event
        .fields
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ");
    let removed = if ev.raw.removed { " [removed]" } else { "" };
    println!(
        "{:>12}  {:#x}  {}({}){}",
        ev.position().to_string(),
        ev.transaction_hash(),
        ev.event.name,
        fields,
        removed
    );
    Ok(())
}

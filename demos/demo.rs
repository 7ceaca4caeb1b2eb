//! Builds a small list, prints it, removes one absent and one present
//! element, then tears it down. Run with `RUST_LOG=trace` to see the notices.

use anyhow::{Context, Result};
use locked_list::LinkedList;

fn print_positions(list: &LinkedList<i32>) {
    for i in 0..list.len() {
        if let Some(value) = list.get_cloned(i) {
            println!("element at position {i}: {value}");
        }
    }
    println!("size: {}", list.len());
}

fn main() -> Result<()> {
    env_logger::init();

    let list = LinkedList::new();
    list.insert(1).context("inserting 1")?;
    let two = list.insert(2).context("inserting 2")?;
    list.insert(3).context("inserting 3")?;
    print_positions(&list);

    // 4 lives in another list, its ticket means nothing here
    let others = LinkedList::new();
    let four = others.insert(4).context("inserting 4")?;
    if list.remove(&four).is_none() {
        println!("element 4 not found");
    }

    let removed = list.remove(&two).context("element 2 should be present")?;
    println!("removed element {removed}");
    print_positions(&list);

    println!("torn down {} elements", list.teardown());
    Ok(())
}

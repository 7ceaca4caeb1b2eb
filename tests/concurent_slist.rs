use locked_list::LinkedList;

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn con_insert() {
    const THREADS: usize = 20;
    const ITEMS: usize = 1000;

    let list = Arc::new(LinkedList::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles = (0..THREADS)
        .map(|t| {
            let list = list.clone();
            let barrier = barrier.clone();

            thread::spawn(move || {
                barrier.wait();
                for i in 0..ITEMS {
                    list.insert(t * ITEMS + i).unwrap();
                }
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(list.len(), ITEMS * THREADS);
    let seen = list.to_vec().into_iter().collect::<HashSet<_>>();
    assert_eq!(seen.len(), ITEMS * THREADS);
    assert!((0..ITEMS * THREADS).all(|v| seen.contains(&v)));
}

#[test]
fn con_insert_one_each() {
    const THREADS: usize = 32;

    let list = Arc::new(LinkedList::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles = (0..THREADS)
        .map(|t| {
            let list = list.clone();
            let barrier = barrier.clone();

            thread::spawn(move || {
                barrier.wait();
                list.insert(t).unwrap()
            })
        })
        .collect::<Vec<_>>();

    let tickets = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();

    assert_eq!(list.len(), THREADS);
    for ticket in &tickets {
        assert!(list.contains(ticket));
    }
    let mut values = (0..THREADS)
        .map(|i| list.get_cloned(i).unwrap())
        .collect::<Vec<_>>();
    values.sort_unstable();
    assert_eq!(values, (0..THREADS).collect::<Vec<_>>());
}

#[test]
fn con_remove() {
    const THREADS: usize = 16;
    const ITEMS: usize = 400;

    let list = Arc::new(LinkedList::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let tickets = Arc::new(
        (0..ITEMS * THREADS)
            .map(|i| list.insert(i).unwrap())
            .collect::<Vec<_>>(),
    );

    let handles = (0..THREADS)
        .map(|t| {
            let list = list.clone();
            let barrier = barrier.clone();
            let tickets = tickets.clone();

            thread::spawn(move || {
                barrier.wait();
                for ticket in &tickets[t * ITEMS..(t + 1) * ITEMS] {
                    assert!(list.remove(ticket).is_some());
                }
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(list.is_empty());
    assert!(list.get(0).is_none());
}

#[test]
fn insert_while_remove() {
    const THREADS: usize = 16;
    const ITEMS: usize = 400;

    let list = Arc::new(LinkedList::new());
    let barrier = Arc::new(Barrier::new(THREADS * 2));

    let existing = Arc::new(
        (0..ITEMS * THREADS)
            .map(|i| list.insert(i).unwrap())
            .collect::<Vec<_>>(),
    );

    let inserters = (0..THREADS).map(|_| {
        let list = list.clone();
        let barrier = barrier.clone();

        thread::spawn(move || {
            barrier.wait();
            for i in 0..ITEMS {
                list.insert(usize::MAX - i).unwrap();
            }
            0
        })
    });

    let removers = (0..THREADS).map(|t| {
        let list = list.clone();
        let barrier = barrier.clone();
        let existing = existing.clone();

        thread::spawn(move || {
            barrier.wait();
            // remove every other pre-existing element
            existing[t * ITEMS..(t + 1) * ITEMS]
                .iter()
                .step_by(2)
                .filter(|ticket| list.remove(ticket).is_some())
                .count()
        })
    });

    let handles = inserters.chain(removers).collect::<Vec<_>>();
    let removed: usize = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .sum();

    assert_eq!(removed, ITEMS * THREADS / 2);
    let expected = ITEMS * THREADS + ITEMS * THREADS - removed;
    assert_eq!(list.len(), expected);

    // the chain is still fully traversable
    let mut walked = 0;
    list.for_each(|_| walked += 1);
    assert_eq!(walked, expected);
    assert!(list.get(expected - 1).is_some());
    assert!(list.get(expected).is_none());
}

#[test]
fn get_while_clear() {
    const THREADS: usize = 8;
    const ITEMS: usize = 1000;

    let list = Arc::new(LinkedList::new());
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let handles = (0..THREADS)
        .map(|_| {
            let list = list.clone();
            let barrier = barrier.clone();

            thread::spawn(move || {
                barrier.wait();
                for i in 0..ITEMS {
                    list.insert(i).unwrap();
                    // may be absent if a clear won the race, never panics
                    let _ = list.get_cloned(ITEMS - i);
                }
            })
        })
        .collect::<Vec<_>>();

    barrier.wait();
    let mut cleared = 0;
    for _ in 0..100 {
        cleared += list.clear();
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cleared + list.len(), ITEMS * THREADS);
    let list = Arc::try_unwrap(list).unwrap();
    assert_eq!(cleared + list.teardown(), ITEMS * THREADS);
}

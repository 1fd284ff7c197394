// Share one table between threads.
use shardtable::{Table, TableError};

use std::{sync::Arc, thread};

fn value(n: usize) -> String {
    format!("value {n}")
}

fn main() -> Result<(), TableError> {
    const NUM_THREADS: usize = 16;
    const NUM_KEYS_PER_THREAD: usize = 64;

    // Start small. The table doubles its bucket array as it fills up.
    let table = Arc::new(Table::builder().initial_capacity(4).record_stats().build()?);

    // Spawn threads and read and update the table simultaneously.
    let threads: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            let my_table = Arc::clone(&table);
            let start = i * NUM_KEYS_PER_THREAD;
            let end = (i + 1) * NUM_KEYS_PER_THREAD;

            thread::spawn(move || -> Result<(), TableError> {
                // Insert 64 entries. (NUM_KEYS_PER_THREAD = 64)
                for key in start..end {
                    my_table.insert(key, value(key))?;
                    // get() returns Option<String>, a clone of the stored value.
                    assert_eq!(my_table.get(&key), Some(value(key)));
                }

                // Remove every 4th of the inserted entries.
                for key in (start..end).step_by(4) {
                    my_table.remove(&key);
                }
                Ok(())
            })
        })
        .collect();

    // Wait for all threads to complete.
    for t in threads {
        t.join().expect("Failed")?;
    }

    // Verify the result.
    for key in 0..(NUM_THREADS * NUM_KEYS_PER_THREAD) {
        if key % 4 == 0 {
            assert_eq!(table.get(&key), None);
        } else {
            assert_eq!(table.get(&key), Some(value(key)));
        }
    }

    println!(
        "{} entries in {} buckets, {:?}",
        table.len(),
        table.capacity(),
        table.stats()
    );
    Ok(())
}

//! Decodes a small tag-length-value buffer into an `EntryList`.
//!
//! This plays the role of a binary format decoder: it walks the input, takes one node from an
//! `EntryPool` per decoded value, detaches the finished list from the pool and releases the list
//! once it has been consumed.

use entry_pool::{EntryList, EntryPool, Error};

const TAG_UINT: u8 = 1;
const TAG_UTF8: u8 = 2;

#[derive(Debug, Default)]
enum Value {
    #[default]
    Empty,
    Uint(u64),
    Utf8(String),
    Invalid(u8),
}

fn decode(mut input: &[u8]) -> Result<EntryList<Value>, Error> {
    // Starting small shows the pool growing as the input is consumed.
    let mut pool = EntryPool::<Value>::new(2)?;

    while let [tag, len, rest @ ..] = input {
        let len = usize::from(*len).min(rest.len());
        let (body, remainder) = rest.split_at(len);
        input = remainder;

        let value = match *tag {
            TAG_UINT => Value::Uint(
                body.iter()
                    .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte)),
            ),
            TAG_UTF8 => Value::Utf8(String::from_utf8_lossy(body).into_owned()),
            other => Value::Invalid(other),
        };

        // Any failure here aborts the decode. Returning drops the pool and everything in it.
        *pool.alloc()?.payload_mut() = value;
    }

    println!(
        "decoded {} entries into {} slabs",
        pool.len(),
        pool.slab_count()
    );

    Ok(pool.detach())
}

fn main() -> Result<(), Error> {
    let input = [
        TAG_UTF8, 5, b'h', b'e', b'l', b'l', b'o', //
        TAG_UINT, 2, 0x01, 0x00, //
        TAG_UTF8, 5, b'w', b'o', b'r', b'l', b'd', //
        TAG_UINT, 1, 42, //
        9, 0, //
    ];

    let list = decode(&input)?;

    for (index, node) in list.iter().enumerate() {
        let marker = if node.is_head() { "*" } else { " " };
        println!("{marker} {index}: {:?}", node.payload());
    }

    debug_assert!(!matches!(list.first().map(|node| node.payload()), Some(Value::Empty)));

    list.dispose()
}

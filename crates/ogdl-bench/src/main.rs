//! Benchmark for OGDL binary encoding using a JSON document.
//!
//! Without an argument a synthetic dataset of city records is generated.

use std::error::Error;
use std::fs;
use std::time::{Duration, Instant};

use ogdl::{EncodeOptions, Graph, Scalar};
use serde_json::{Map, Value, json};

const SYNTHETIC_RECORDS: usize = 50_000;
const DECODE_ITERS: u32 = 10;
const ZSTD_LEVEL: i32 = 3;

// =============================================================================
// JSON CONVERSION
// =============================================================================

/// Appends `value` below `node`.
///
/// Object members become named children. Array elements that are objects or
/// arrays get a child named by their index; scalar elements are added as is.
fn add_json(node: &mut Graph, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            node.add(*b);
        }
        Value::Number(n) => {
            node.add(number(n));
        }
        Value::String(s) => {
            node.add(s.as_str());
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    add_json(node.add(i as i64), item);
                } else {
                    add_json(node, item);
                }
            }
        }
        Value::Object(members) => add_members(node, members),
    }
}

fn add_members(node: &mut Graph, members: &Map<String, Value>) {
    for (key, value) in members {
        add_json(node.add(key.as_str()), value);
    }
}

fn number(n: &serde_json::Number) -> Scalar {
    match (n.as_i64(), n.as_f64()) {
        (Some(i), _) => Scalar::Int(i),
        (None, Some(f)) => Scalar::Float(f),
        _ => Scalar::Str(n.to_string()),
    }
}

fn json_to_graph(value: &Value) -> Graph {
    let mut g = Graph::nil();
    add_json(&mut g, value);
    g
}

// =============================================================================
// SYNTHETIC DATA
// =============================================================================

fn synthetic(records: usize) -> Value {
    let cities: Vec<Value> = (0..records)
        .map(|i| {
            let country = ["NL", "DE", "FR", "ES", "IT"][i % 5];
            json!({
                "id": i,
                "name": format!("City {i}"),
                "country_code": country,
                "population": (i * 7919) % 5_000_000,
                "latitude": (i as f64 * 0.37) % 90.0,
                "longitude": (i as f64 * 0.71) % 180.0,
                "capital": i % 97 == 0,
                "timezones": ["UTC", format!("UTC+{}", i % 12)],
            })
        })
        .collect();
    json!({ "cities": cities })
}

// =============================================================================
// REPORTING
// =============================================================================

fn mb(bytes: usize) -> f64 {
    bytes as f64 / 1_000_000.0
}

fn throughput(bytes: usize, elapsed: Duration) -> f64 {
    mb(bytes) / elapsed.as_secs_f64().max(f64::EPSILON)
}

fn time_decode(bytes: &[u8], expected: &Graph) -> Result<Duration, Box<dyn Error>> {
    for _ in 0..3 {
        ogdl::decode(bytes)?;
    }
    let start = Instant::now();
    for _ in 0..DECODE_ITERS {
        let decoded = ogdl::decode(bytes)?;
        if decoded.len() != expected.len() {
            return Err("decoded graph differs from the source".into());
        }
    }
    Ok(start.elapsed() / DECODE_ITERS)
}

fn main() -> Result<(), Box<dyn Error>> {
    let (label, json_text) = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading JSON from: {path}");
            let text = fs::read_to_string(&path)?;
            (path, text)
        }
        None => {
            println!("Generating {SYNTHETIC_RECORDS} synthetic records");
            let text = serde_json::to_string(&synthetic(SYNTHETIC_RECORDS))?;
            ("synthetic".to_string(), text)
        }
    };

    let parse_start = Instant::now();
    let value: Value = serde_json::from_str(&json_text)?;
    println!("Parsed {} bytes of JSON in {:?}", json_text.len(), parse_start.elapsed());

    let convert_start = Instant::now();
    let graph = json_to_graph(&value);
    println!(
        "Converted to a graph of depth {} in {:?}",
        graph.depth(),
        convert_start.elapsed()
    );

    // Uncompressed
    let encode_start = Instant::now();
    let encoded = ogdl::encode(&graph)?;
    let encode_time = encode_start.elapsed();
    println!("\nUncompressed: {} bytes in {:?}", encoded.len(), encode_time);
    println!("  Throughput: {:.2} MB/s", throughput(encoded.len(), encode_time));

    // Compressed
    let compress_start = Instant::now();
    let compressed =
        ogdl::codec::encode_with_options(&graph, EncodeOptions::compressed(ZSTD_LEVEL))?;
    let compress_time = compress_start.elapsed();
    println!(
        "\nCompressed (level {ZSTD_LEVEL}): {} bytes in {:?}",
        compressed.len(),
        compress_time
    );
    println!(
        "  Compression ratio: {:.1}x",
        encoded.len() as f64 / compressed.len().max(1) as f64
    );

    let decode_time = time_decode(&encoded, &graph)?;
    println!("\nDecode (uncompressed): {decode_time:?} (avg of {DECODE_ITERS} iterations)");
    println!("  Throughput: {:.2} MB/s", throughput(encoded.len(), decode_time));

    let decode_compressed_time = time_decode(&compressed, &graph)?;
    println!(
        "\nDecode (compressed): {decode_compressed_time:?} (avg of {DECODE_ITERS} iterations)"
    );
    println!(
        "  Throughput: {:.2} MB/s (uncompressed equivalent)",
        throughput(encoded.len(), decode_compressed_time)
    );

    if ogdl::decode(&compressed)? != graph {
        return Err("compressed round trip changed the graph".into());
    }

    println!("\n=== Summary ===");
    println!("Input: {label}");
    println!("JSON size: {} bytes ({:.1} MB)", json_text.len(), mb(json_text.len()));
    println!("OGDL uncompressed: {} bytes ({:.1} MB)", encoded.len(), mb(encoded.len()));
    println!("OGDL compressed: {} bytes ({:.1} MB)", compressed.len(), mb(compressed.len()));
    println!(
        "Size vs JSON: {:.1}% (uncompressed), {:.1}% (compressed)",
        100.0 * encoded.len() as f64 / json_text.len() as f64,
        100.0 * compressed.len() as f64 / json_text.len() as f64
    );
    Ok(())
}

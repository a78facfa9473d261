
use std::{collections::HashMap, env, error::Error, fs::File, io::BufReader, process};
extern crate glove_preprocess;
use glove_preprocess::{files_handling, Record, RecordReader, VocabEntry};


// sanity checks on the outputs of the preprocessing, ran independently from main.
// "r" checks that a shuffled record file holds exactly the records of its source.
// "v" checks that a vocabulary file is ranked by count, ties alphabetical.
// example: ... r Output/cooc.bin Output/cooccurrence.shuf.bin
//          ... v Output/vocab

fn main() {

    let args: Vec<String> = env::args().collect();
    let result = match (args.get(1).map(|s| s.as_str()), args.len()) {
        (Some("r"), 4) => check_records(&args[2], &args[3]),
        (Some("v"), 3) => check_vocab(&args[2]),
        _ => Err("usage: verify r <source.bin> <shuffled.bin> | verify v <vocab path without .txt>".into())
    };

    match result {
        Ok(summary) => println!("{}", summary),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn count_records(path: &str) -> Result<(u64, HashMap<(i32, i32, u64), u64>), Box<dyn Error>> {

    let reader = RecordReader::new(BufReader::new(File::open(path)?));
    let mut total = 0;
    let mut counts = HashMap::new();
    for record in reader {
        let record: Record = record?;
        *counts.entry(record.key()).or_insert(0) += 1;
        total += 1;
    }
    Ok((total, counts))
}

fn check_records(source: &str, shuffled: &str) -> Result<String, Box<dyn Error>> {

    let (n_source, source_counts) = count_records(source)?;
    let (n_shuffled, shuffled_counts) = count_records(shuffled)?;

    if n_source != n_shuffled {
        return Err(format!("record counts differ: {} in source, {} shuffled", n_source, n_shuffled).into());
    }
    if source_counts != shuffled_counts {
        let missing = source_counts.iter().filter(|(k, v)| shuffled_counts.get(*k) != Some(*v)).count();
        return Err(format!("{} distinct records do not match between source and shuffled", missing).into());
    }
    Ok(format!("ok: {} records, {} distinct", n_source, source_counts.len()))
}

fn check_vocab(path: &str) -> Result<String, Box<dyn Error>> {

    let vocab = files_handling::read_input::<Vec<VocabEntry>>(path)?;
    for (i, pair) in vocab.windows(2).enumerate() {
        let ranked = pair[0].count > pair[1].count || (pair[0].count == pair[1].count && pair[0].word < pair[1].word);
        if !ranked {
            return Err(format!("entries {} and {} are out of order", i + 1, i + 2).into());
        }
    }
    if vocab.iter().any(|entry| entry.word == b"<unk>") {
        return Err("vocabulary holds the reserved <unk> token".into());
    }
    Ok(format!("ok: {} words", vocab.len()))
}

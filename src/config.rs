
use crate::error::PreprocessError;
use crate::shuffle::{array_size_for_memory, ShuffleConfig, DEFAULT_MEMORY, DEFAULT_TEMP_FILE};
use crate::vocab::VocabConfig;

use serde_json::Value;
use std::{error::Error, fmt::Display, fs, path::Path};


#[derive(Clone, Debug)]
pub struct JsonTypes {
    pub corpus_file: Option<String>,
    pub cooccurrence_file: Option<String>,
    pub output_dir: String,
    pub saved_vocab: Option<bool>,
    pub verbose: u8,
    pub seed: Option<u64>,
    pub memory: f64,
    pub json_vocab: VocabConfig,
    pub json_shuffle: ShuffleConfig,
}

impl Display for JsonTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using hyper-params:
        corpus_file: {:?}
        cooccurrence_file: {:?}
        output_dir: {}
        saved_vocab: {:?}
        verbose: {}
        seed: {:?}
        memory: {}
        Using {}
        Using {}",
        self.corpus_file, self.cooccurrence_file, self.output_dir, self.saved_vocab, self.verbose,
        self.seed, self.memory, self.json_vocab, self.json_shuffle)
    }
}

pub struct Config {
    params: JsonTypes
}

fn invalid(msg: String) -> Box<dyn Error> {
    Box::new(PreprocessError::InvalidConfig(msg))
}

fn optional_str(json: &Value, key: &str) -> Result<Option<String>, Box<dyn Error>> {
    match json.get(key) {
        Some(value) => match value.as_str() {
            Some(s) => Ok(Some(s.to_string())),
            None => Err(invalid(format!("cannot cast {} to string", key)))
        },
        None => Ok(None)
    }
}

impl Config {

    pub fn get_params(&self) -> JsonTypes {
        return self.params.clone()
    }

    pub fn new(args: &[String]) -> Result<Config, Box<dyn Error>> {

        if args.len() != 2 {
            return Err(invalid("input should be a path to json file only".to_string()));
        }

        // parse input json
        let f = fs::File::open(&args[1]).map_err(|e| PreprocessError::io(&args[1], e))?;
        let json: Value = serde_json::from_reader(f)?;
        Config::from_json(&json)
    }

    pub fn from_json(json: &Value) -> Result<Config, Box<dyn Error>> {

        // validate inputs and output in json
        let output_dir = match json.get("output_dir") {
            Some(output_dir) => output_dir.as_str().ok_or_else(|| invalid("cannot cast output_dir to string".to_string()))?.to_string(),
            None => return Err(invalid("output_dir was not supplied through json".to_string()))
        };
        let corpus_file = optional_str(json, "corpus_file")?;
        let cooccurrence_file = optional_str(json, "cooccurrence_file")?;
        if corpus_file.is_none() && cooccurrence_file.is_none() {
            return Err(invalid("neither corpus_file nor cooccurrence_file was supplied".to_string()));
        }

        let saved_vocab = match json.get("saved_vocab") {
            Some(saved_vocab) => Some(saved_vocab.as_bool().ok_or_else(|| invalid("given saved_vocab is not a boolean".to_string()))?),
            None => None
        };

        // handle default vs input parameters
        let verbose = match json.get("verbose") {
            Some(verbose) => verbose.as_u64().ok_or_else(|| invalid("given verbose is not a non negative integer".to_string()))?,
            None => 2
        };
        if verbose > 2 {
            return Err(invalid(format!("verbose should be 0, 1 or 2, got {}", verbose)));
        }
        let seed = match json.get("seed") {
            Some(seed) => Some(seed.as_u64().ok_or_else(|| invalid("given seed is not a non negative integer".to_string()))?),
            None => None
        };

        // min_count < 1 means 1
        let min_count = match json.get("min_count") {
            Some(min_count) => min_count.as_i64().ok_or_else(|| invalid("given min_count is not numeric".to_string()))?,
            None => 1
        };
        let max_vocab = match json.get("max_vocab") {
            Some(max_vocab) => max_vocab.as_i64().ok_or_else(|| invalid("given max_vocab is not numeric".to_string()))?,
            None => -1
        };

        let memory = match json.get("memory") {
            Some(memory) => memory.as_f64().ok_or_else(|| invalid("given memory is not numeric".to_string()))?,
            None => DEFAULT_MEMORY
        };
        if !(memory > 0.0) {
            return Err(invalid(format!("memory should be positive, got {}", memory)));
        }

        // an explicit array_size overrides the memory budget, non positive values are ignored
        let array_size = match json.get("array_size") {
            Some(array_size) => array_size.as_i64().ok_or_else(|| invalid("given array_size is not numeric".to_string()))?,
            None => -1
        };
        let array_size = if array_size > 0 { array_size as usize } else { array_size_for_memory(memory) };

        // relative temp file prefixes live next to the outputs
        let temp_file = optional_str(json, "temp_file")?.unwrap_or_else(|| DEFAULT_TEMP_FILE.to_string());
        let temp_file = if Path::new(&temp_file).is_absolute() {
            temp_file
        } else {
            Path::new(&output_dir).join(&temp_file).to_string_lossy().into_owned()
        };

        let params = JsonTypes {
            corpus_file: corpus_file,
            cooccurrence_file: cooccurrence_file,
            output_dir: output_dir,
            saved_vocab: saved_vocab,
            verbose: verbose as u8,
            seed: seed,
            memory: memory,
            json_vocab: VocabConfig {
                verbose: verbose as u8,
                min_count: min_count.max(1) as u64,
                max_vocab: max_vocab
            },
            json_shuffle: ShuffleConfig {
                verbose: verbose as u8,
                array_size: array_size,
                temp_file: temp_file
            }
        };

        Ok (
            Self {
                params: params
            }
        )
    }

}


pub mod files_handling {

    use crate::error::PreprocessError;
    use crate::vocab::{write_vocab, VocabEntry};

    use flate2::read::GzDecoder;
    use std::fs::{self, File};
    use std::io::{BufRead, BufReader, BufWriter};
    use std::path::Path;

    pub fn read_input<R: ReadFile>(file_path: &str) -> Result<<R as ReadFile>::Item, <R as ReadFile>::Error> {
        let input = <R as ReadFile>::read_file(file_path)?;
        Ok(input)
    }

    pub fn save_output<S: SaveFile>(output_dir: &str, file_name: &str, item: S) -> Result<(), <S as SaveFile>::Error>
    where
        <S as SaveFile>::Error: From<PreprocessError>,
    {
        // create output folder
        fs::create_dir_all(output_dir).map_err(|e| PreprocessError::io(output_dir, e))?;

        item.save_file(output_dir, file_name)?;
        return Ok(())
    }

    /// Opens a corpus for reading, `.gz` files are decompressed on the fly.
    pub fn open_corpus(file_path: &str) -> Result<Box<dyn BufRead>, PreprocessError> {

        let f = File::open(file_path).map_err(|e| PreprocessError::io(file_path, e))?;
        if file_path.ends_with(".gz") {
            Ok(Box::new(BufReader::new(GzDecoder::new(f))))
        } else {
            Ok(Box::new(BufReader::new(f)))
        }
    }

    pub trait ReadFile {
        type Error;
        type Item;
        fn read_file(file_path: &str) -> Result<Self::Item, Self::Error>;
    }

    pub trait SaveFile {
        type Error;
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<(), Self::Error>;
    }

    impl SaveFile for Vec<VocabEntry> {
        type Error = PreprocessError;
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<(), Self::Error> {
            let out = Path::new(output_dir).join(file_name.to_string() + ".txt");
            let f = File::create(&out).map_err(|e| PreprocessError::io(&out, e))?;
            let mut writer = BufWriter::new(f);
            write_vocab(&mut writer, self).map_err(|e| match e {
                PreprocessError::Stream(err) => PreprocessError::io(&out, err),
                other => other
            })
        }
    }

    impl ReadFile for Vec<VocabEntry> {
        type Error = PreprocessError;
        type Item = Self;
        fn read_file(file_path: &str) -> Result<Self::Item, Self::Error> {

            let in_file = file_path.to_string() + ".txt";
            let f = BufReader::new(File::open(&in_file).map_err(|e| PreprocessError::io(&in_file, e))?);

            let mut entries = Vec::new();
            for (i, line) in f.split(b'\n').enumerate() {
                let line = line.map_err(|e| PreprocessError::io(&in_file, e))?;
                entries.push(parse_vocab_line(&line, i + 1)?);
            }
            Ok(entries)
        }
    }

    // a line is `<word> <count>`, the word itself never holds whitespace
    fn parse_vocab_line(line: &[u8], line_number: usize) -> Result<VocabEntry, PreprocessError> {

        let malformed = || PreprocessError::MalformedVocab {
            line: line_number,
            content: String::from_utf8_lossy(line).into_owned()
        };

        let split = line.iter().rposition(|&b| b == b' ').ok_or_else(malformed)?;
        let (word, count) = (&line[..split], &line[split + 1..]);
        if word.is_empty() {
            return Err(malformed())
        }
        let count = std::str::from_utf8(count).ok()
            .and_then(|c| c.parse::<u64>().ok())
            .ok_or_else(malformed)?;

        Ok(VocabEntry { word: word.to_vec(), count: count })
    }

}


#[cfg(test)]
mod tests {

    use super::files_handling::{open_corpus, read_input, save_output};
    use super::Config;
    use crate::error::PreprocessError;
    use crate::shuffle::array_size_for_memory;
    use crate::vocab::VocabEntry;
    use flate2::{write::GzEncoder, Compression};
    use serde_json::json;
    use std::io::{Read, Write};

    #[test]
    fn defaults_are_filled_in() {

        let params = Config::from_json(&json!({
            "output_dir": "/data/out",
            "corpus_file": "/data/text8"
        })).unwrap().get_params();

        assert_eq!(params.verbose, 2);
        assert_eq!(params.json_vocab.min_count, 1);
        assert_eq!(params.json_vocab.max_vocab, -1);
        assert_eq!(params.json_shuffle.array_size, array_size_for_memory(4.0));
        assert_eq!(params.json_shuffle.temp_file, "/data/out/temp_shuffle");
        assert!(params.cooccurrence_file.is_none());
        assert!(params.seed.is_none());
    }

    #[test]
    fn explicit_values_win() {

        let params = Config::from_json(&json!({
            "output_dir": "out",
            "cooccurrence_file": "cooc.bin",
            "verbose": 0,
            "min_count": -3,
            "max_vocab": 400000,
            "memory": 1.0,
            "array_size": 1000,
            "temp_file": "/tmp/shuf",
            "seed": 17
        })).unwrap().get_params();

        assert_eq!(params.json_vocab.verbose, 0);
        assert_eq!(params.json_vocab.min_count, 1);
        assert_eq!(params.json_vocab.max_vocab, 400000);
        assert_eq!(params.json_shuffle.array_size, 1000);
        assert_eq!(params.json_shuffle.temp_file, "/tmp/shuf");
        assert_eq!(params.seed, Some(17));
    }

    #[test]
    fn non_positive_array_size_falls_back_to_memory() {

        let params = Config::from_json(&json!({
            "output_dir": "out",
            "cooccurrence_file": "cooc.bin",
            "memory": 2.0,
            "array_size": -1
        })).unwrap().get_params();
        assert_eq!(params.json_shuffle.array_size, array_size_for_memory(2.0));
    }

    #[test]
    fn bad_values_are_rejected() {

        let cases = [
            json!({ "corpus_file": "c" }),
            json!({ "output_dir": "out" }),
            json!({ "output_dir": "out", "corpus_file": "c", "verbose": 3 }),
            json!({ "output_dir": "out", "corpus_file": "c", "memory": 0 }),
            json!({ "output_dir": "out", "corpus_file": "c", "max_vocab": "many" }),
            json!({ "output_dir": 4, "corpus_file": "c" }),
        ];
        for case in cases {
            assert!(Config::from_json(&case).is_err(), "{} should fail", case);
        }
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        assert!(Config::new(&["prog".to_string()]).is_err());
    }

    #[test]
    fn vocab_file_round_trip() {

        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested");
        let out_dir = out_dir.to_str().unwrap();
        let vocab = vec![VocabEntry::new(b"the", 10), VocabEntry::new(b"\xc3\xa9t\xc3\xa9", 3), VocabEntry::new(b"a", 1)];

        save_output(out_dir, "vocab", vocab.clone()).unwrap();
        let text = std::fs::read(dir.path().join("nested").join("vocab.txt")).unwrap();
        assert_eq!(text, b"the 10\n\xc3\xa9t\xc3\xa9 3\na 1\n".to_vec());

        let back = read_input::<Vec<VocabEntry>>(&format!("{}/vocab", out_dir)).unwrap();
        assert_eq!(back, vocab);
    }

    #[test]
    fn malformed_vocab_line_is_reported() {

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vocab.txt"), b"the 10\nbroken\n").unwrap();
        let path = dir.path().join("vocab");

        match read_input::<Vec<VocabEntry>>(path.to_str().unwrap()) {
            Err(PreprocessError::MalformedVocab { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn gzipped_corpus_is_decompressed() {

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt.gz");
        let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"hello world\n").unwrap();
        encoder.finish().unwrap();

        let mut text = String::new();
        open_corpus(path.to_str().unwrap()).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello world\n");
    }

}

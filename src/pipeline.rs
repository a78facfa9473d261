
// imports
use crate::config::{files_handling, Config, JsonTypes};
use crate::error::PreprocessError;
use crate::random::RandomSource;
use crate::shuffle::ChunkShuffler;
use crate::vocab::{count_corpus, VocabEntry};

use log::{info, LevelFilter};
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Instant;

pub const VOCAB_FILE: &str = "vocab";
pub const SHUFFLED_FILE: &str = "cooccurrence.shuf.bin";

pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Error,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug
    }
}

pub struct Pipeline {}

impl Pipeline {

    // runs the preprocessing in up to 2 steps -
    // -> vocabulary counting from the corpus
    // -> external shuffle of the cooccurrence records
    // a step runs when its input is configured

    pub fn run(args: &[String]) -> Result<(), Box<dyn Error>> {

        let params = Config::new(args)?.get_params();
        log::set_max_level(level_for(params.verbose));
        info!("{}", params);

        let mut rng = RandomSource::new(params.seed);
        info!("using random seed {}", rng.seed());

        if let Some(corpus_file) = &params.corpus_file {
            if params.saved_vocab.unwrap_or(false) {
                let vocab_path = Path::new(&params.output_dir).join(VOCAB_FILE);
                let vocab = files_handling::read_input::<Vec<VocabEntry>>(&vocab_path.to_string_lossy())?;
                info!("loaded saved vocabulary of {} words", vocab.len());
            } else {
                let timer = Instant::now();
                let vocab = Pipeline::build_vocab(corpus_file, &params)?;
                info!("finished creation and saved vocab of {} words, took {} seconds ...", vocab, timer.elapsed().as_secs());
            }
        }

        if let Some(cooccurrence_file) = &params.cooccurrence_file {
            let timer = Instant::now();
            let shuffled = Pipeline::shuffle(cooccurrence_file, &params, &mut rng)?;
            info!("finished shuffling {} records, took {} seconds ...", shuffled, timer.elapsed().as_secs());
        }

        Ok(())
    }

    fn build_vocab(corpus_file: &str, params: &JsonTypes) -> Result<usize, PreprocessError> {

        let corpus = files_handling::open_corpus(corpus_file)?;
        let vocab = count_corpus(corpus, &params.json_vocab)?;
        let size = vocab.len();
        files_handling::save_output::<Vec<VocabEntry>>(&params.output_dir, VOCAB_FILE, vocab)?;
        Ok(size)
    }

    fn shuffle(cooccurrence_file: &str, params: &JsonTypes, rng: &mut RandomSource) -> Result<u64, PreprocessError> {

        fs::create_dir_all(&params.output_dir).map_err(|e| PreprocessError::io(&params.output_dir, e))?;

        let input = File::open(cooccurrence_file).map_err(|e| PreprocessError::io(cooccurrence_file, e))?;
        let out = Path::new(&params.output_dir).join(SHUFFLED_FILE);
        let output = File::create(&out).map_err(|e| PreprocessError::io(&out, e))?;

        let mut writer = BufWriter::new(output);
        ChunkShuffler::new(params.json_shuffle.clone(), rng).shuffle_stream(BufReader::new(input), &mut writer)
    }

}


#[cfg(test)]
mod tests {

    use super::{Pipeline, SHUFFLED_FILE};
    use crate::record::{Record, RecordReader};
    use std::fs;

    #[test]
    fn runs_both_stages_from_a_json_file() {

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(root.join("corpus.txt"), "a b a c b a\n").unwrap();
        let records: Vec<Record> = (0..25).map(|i| Record::new(i, 24 - i, i as f64)).collect();
        let mut raw = Vec::new();
        Record::write_all(&mut raw, &records).unwrap();
        fs::write(root.join("cooc.bin"), &raw).unwrap();

        let config = serde_json::json!({
            "output_dir": root.join("out").to_str().unwrap(),
            "corpus_file": root.join("corpus.txt").to_str().unwrap(),
            "cooccurrence_file": root.join("cooc.bin").to_str().unwrap(),
            "verbose": 0,
            "array_size": 4,
            "seed": 3
        });
        let config_path = root.join("config.json");
        fs::write(&config_path, config.to_string()).unwrap();

        let args = vec!["prog".to_string(), config_path.to_str().unwrap().to_string()];
        Pipeline::run(&args).unwrap();

        let vocab = fs::read_to_string(root.join("out").join("vocab.txt")).unwrap();
        assert_eq!(vocab, "a 3\nb 2\nc 1\n");

        let shuffled = fs::read(root.join("out").join(SHUFFLED_FILE)).unwrap();
        let mut out = RecordReader::new(shuffled.as_slice()).collect::<Result<Vec<Record>, _>>().unwrap();
        out.sort_by_key(|r| r.word1);
        assert_eq!(out, records);

        // only the outputs are left behind
        let mut left: Vec<String> = fs::read_dir(root.join("out")).unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec![SHUFFLED_FILE.to_string(), "vocab.txt".to_string()]);
    }

    #[test]
    fn reserved_token_stops_the_run() {

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("corpus.txt"), "a <unk> b\n").unwrap();

        let config = serde_json::json!({
            "output_dir": root.join("out").to_str().unwrap(),
            "corpus_file": root.join("corpus.txt").to_str().unwrap(),
            "verbose": 0
        });
        let config_path = root.join("config.json");
        fs::write(&config_path, config.to_string()).unwrap();

        let args = vec!["prog".to_string(), config_path.to_str().unwrap().to_string()];
        assert!(Pipeline::run(&args).is_err());
        assert!(!root.join("out").join("vocab.txt").exists());
    }

}


// imports
use crate::error::{PreprocessError, Result};

use log::{debug, info};
use std::fmt::Display;
use std::io::{BufRead, ErrorKind, Write};


pub const TABLE_SIZE: usize = 1_048_576;
pub const MAX_TOKEN_LENGTH: usize = 1000;
pub const RESERVED_TOKEN: &[u8] = b"<unk>";
const HASH_SEED: u32 = 1_159_241;
const NIL: usize = usize::MAX;


#[derive(Clone, Copy, Debug)]
pub struct VocabConfig {
    pub verbose: u8,
    pub min_count: u64,
    pub max_vocab: i64,
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            min_count: 1,
            max_vocab: -1
        }
    }
}

impl Display for VocabConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vocabulary parameters:
        min_count: {},
        max_vocab: {}",
        self.min_count, self.max_vocab
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VocabEntry {
    pub word: Vec<u8>,
    pub count: u64,
}

impl VocabEntry {
    pub fn new(word: &[u8], count: u64) -> VocabEntry {
        Self { word: word.to_vec(), count }
    }
}


// rotate-xor hash over signed bytes, masked to 31 bits
fn bitwise_hash(word: &[u8], tsize: usize, seed: u32) -> usize {
    let mut h = seed;
    for &c in word {
        h ^= (h << 5).wrapping_add(c as i8 as u32).wrapping_add(h >> 2);
    }
    (h & 0x7fff_ffff) as usize % tsize
}

struct HashNode {
    word: Box<[u8]>,
    count: u64,
    next: usize,
}

/// Chained hash table with move-to-front on repeat access.
///
/// Chains are intrusive lists over an arena of nodes, `NIL` terminates a chain.
/// A word seen for the first time is appended at the tail of its chain, a word
/// matched again is relinked to the head.
struct HashTable {
    heads: Vec<usize>,
    nodes: Vec<HashNode>,
}

impl HashTable {

    fn with_size(tsize: usize) -> HashTable {
        Self {
            heads: vec![NIL; tsize],
            nodes: Vec::new()
        }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn insert(&mut self, word: &[u8]) {

        let bucket = bitwise_hash(word, self.heads.len(), HASH_SEED);

        let mut prev = NIL;
        let mut cur = self.heads[bucket];
        while cur != NIL && &*self.nodes[cur].word != word {
            prev = cur;
            cur = self.nodes[cur].next;
        }

        if cur == NIL {
            let idx = self.nodes.len();
            self.nodes.push(HashNode { word: word.into(), count: 1, next: NIL });
            if prev == NIL {
                self.heads[bucket] = idx;
            } else {
                self.nodes[prev].next = idx;
            }
        } else {
            self.nodes[cur].count += 1;
            if prev != NIL {
                self.nodes[prev].next = self.nodes[cur].next;
                self.nodes[cur].next = self.heads[bucket];
                self.heads[bucket] = cur;
            }
        }
    }

    // drain bucket by bucket, each chain from head to tail
    fn into_entries(self) -> Vec<VocabEntry> {

        let HashTable { heads, nodes } = self;
        let mut slots: Vec<Option<HashNode>> = nodes.into_iter().map(Some).collect();
        let mut entries = Vec::with_capacity(slots.len());

        for head in heads {
            let mut cur = head;
            while cur != NIL {
                let node = match slots[cur].take() {
                    Some(node) => node,
                    None => break
                };
                cur = node.next;
                entries.push(VocabEntry { word: node.word.into_vec(), count: node.count });
            }
        }
        entries
    }

    #[cfg(test)]
    fn chain(&self, bucket: usize) -> Vec<&[u8]> {
        let mut words = Vec::new();
        let mut cur = self.heads[bucket];
        while cur != NIL {
            words.push(&*self.nodes[cur].word);
            cur = self.nodes[cur].next;
        }
        words
    }

}


fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

/// Splits a byte stream into whitespace separated tokens.
///
/// Tokens longer than `MAX_TOKEN_LENGTH` bytes come out as consecutive pieces of
/// at most `MAX_TOKEN_LENGTH` bytes.
pub struct WhitespaceTokens<R: BufRead> {
    reader: R,
}

impl<R: BufRead> WhitespaceTokens<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Iterator for WhitespaceTokens<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {

        let mut token = Vec::new();
        loop {
            let buf = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e.into()))
            };

            if buf.is_empty() {
                return if token.is_empty() { None } else { Some(Ok(token)) }
            }

            let mut used = 0;
            let mut complete = false;
            for &b in buf {
                if is_space(b) {
                    used += 1;
                    if !token.is_empty() {
                        complete = true;
                        break;
                    }
                } else {
                    if token.len() == MAX_TOKEN_LENGTH {
                        complete = true;
                        break;
                    }
                    token.push(b);
                    used += 1;
                }
            }
            self.reader.consume(used);

            if complete {
                return Some(Ok(token))
            }
        }
    }
}


/// Accumulates token counts and ranks them into the final vocabulary.
pub struct VocabCounter {
    table: HashTable,
    tokens: u64,
    config: VocabConfig,
}

impl VocabCounter {

    pub fn new(config: VocabConfig) -> VocabCounter {

        if config.verbose > 0 {
            info!("BUILDING VOCABULARY");
        }
        Self {
            table: HashTable::with_size(TABLE_SIZE),
            tokens: 0,
            config: config
        }
    }

    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn unique_words(&self) -> usize {
        self.table.len()
    }

    pub fn add_token(&mut self, token: &[u8]) -> Result<()> {

        if token == RESERVED_TOKEN {
            return Err(PreprocessError::ReservedToken { position: self.tokens })
        }

        self.table.insert(token);
        self.tokens += 1;
        if self.config.verbose > 1 && self.tokens % 100_000 == 0 {
            debug!("Processed {} tokens.", self.tokens);
        }
        Ok(())
    }

    pub fn add_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for token in WhitespaceTokens::new(reader) {
            self.add_token(&token?)?;
        }
        Ok(())
    }

    /// Sorts, truncates and applies the frequency cutoff.
    pub fn finish(self) -> Vec<VocabEntry> {

        let config = self.config;
        if config.verbose > 1 {
            debug!("Processed {} tokens.", self.tokens);
            debug!("Counted {} unique words.", self.table.len());
        }
        let entries = self.table.into_entries();
        rank(entries, &config)
    }

}

// When the size limit applies, the count only sort leaves equal counts in table
// order before the cut, so the cut is not alphabetical. The second sort fixes
// the output order.
fn rank(mut entries: Vec<VocabEntry>, config: &VocabConfig) -> Vec<VocabEntry> {

    let unique = entries.len();
    let min_count = config.min_count.max(1);

    let max_vocab = if config.max_vocab > 0 && (config.max_vocab as u64) < unique as u64 {
        entries.sort_unstable_by(|a, b| b.count.cmp(&a.count));
        config.max_vocab as usize
    } else {
        unique
    };
    entries.truncate(max_vocab);
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));

    // counts are non increasing, the first entry under the cutoff ends the vocabulary
    let kept = entries.iter().position(|entry| entry.count < min_count).unwrap_or(entries.len());
    let cut_by_count = kept < entries.len();
    entries.truncate(kept);

    if config.verbose > 0 {
        if cut_by_count {
            info!("Truncating vocabulary at min count {}.", min_count);
        }
        if max_vocab < unique {
            info!("Truncating vocabulary at size {}.", max_vocab);
        }
        info!("Using vocabulary of size {}.", kept);
    }

    entries
}

pub fn build_vocabulary<I, T>(tokens: I, config: &VocabConfig) -> Result<Vec<VocabEntry>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut counter = VocabCounter::new(*config);
    for token in tokens {
        counter.add_token(token.as_ref())?;
    }
    Ok(counter.finish())
}

/// Counts a whitespace tokenized corpus.
pub fn count_corpus<R: BufRead>(reader: R, config: &VocabConfig) -> Result<Vec<VocabEntry>> {
    let mut counter = VocabCounter::new(*config);
    counter.add_reader(reader)?;
    Ok(counter.finish())
}

/// Writes one `<word> <count>` line per entry.
pub fn write_vocab<W: Write>(writer: &mut W, entries: &[VocabEntry]) -> Result<()> {
    for entry in entries {
        writer.write_all(&entry.word)?;
        writeln!(writer, " {}", entry.count)?;
    }
    writer.flush()?;
    Ok(())
}

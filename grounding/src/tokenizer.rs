//! Phrase tokenization into fixed-length id and mask arrays.

use crate::common::*;
use tokenizers::Tokenizer;

const CLS_TOKEN: &str = "[CLS]";
const SEP_TOKEN: &str = "[SEP]";

/// Token ids and the attention mask of a phrase, both of the requested length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenizedPhrase {
    pub ids: Vec<i64>,
    /// `1` on real tokens and `0` on padding.
    pub mask: Vec<i64>,
}

pub trait PhraseTokenizer
where
    Self: Debug + Send,
{
    fn tokenize(&self, phrase: &str, max_len: usize) -> Result<TokenizedPhrase>;
}

/// Word piece tokenizer in the BERT input layout, `[CLS] pieces... [SEP] 0...`.
#[derive(Debug, Clone)]
pub struct BertPhraseTokenizer {
    tokenizer: Tokenizer,
    cls_id: u32,
    sep_id: u32,
}

impl BertPhraseTokenizer {
    /// Load a `tokenizer.json` file.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        ensure!(
            path.is_file(),
            "the tokenizer file '{}' does not exist",
            path.display()
        );
        let tokenizer = Tokenizer::from_file(path).map_err(|err| {
            format_err!("unable to load tokenizer '{}': {}", path.display(), err)
        })?;
        Self::new(tokenizer)
    }

    pub fn new(tokenizer: Tokenizer) -> Result<Self> {
        let special_id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| format_err!("the tokenizer has no '{}' token", token))
        };
        let cls_id = special_id(CLS_TOKEN)?;
        let sep_id = special_id(SEP_TOKEN)?;

        Ok(Self {
            tokenizer,
            cls_id,
            sep_id,
        })
    }
}

impl PhraseTokenizer for BertPhraseTokenizer {
    fn tokenize(&self, phrase: &str, max_len: usize) -> Result<TokenizedPhrase> {
        ensure!(
            max_len >= 2,
            "max_len must be at least 2, but get {}",
            max_len
        );

        let encoding = self
            .tokenizer
            .encode(phrase, false)
            .map_err(|err| format_err!("unable to tokenize '{}': {}", phrase, err))?;
        let pieces = encoding.get_ids();
        let num_pieces = pieces.len().min(max_len - 2);

        let mut ids: Vec<i64> = Vec::with_capacity(max_len);
        ids.push(self.cls_id as i64);
        ids.extend(pieces[..num_pieces].iter().map(|&id| id as i64));
        ids.push(self.sep_id as i64);

        let mut mask = vec![1; ids.len()];
        ids.resize(max_len, 0);
        mask.resize(max_len, 0);

        Ok(TokenizedPhrase { ids, mask })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TOKENIZER_JSON: &str = r###"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": {
                "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3,
                "the": 4, "car": 5, "to": 6, "north": 7, "south": 8, "##s": 9,
                "a": 10, "dog": 11, "west": 12, "east": 13, "of": 14
            }
        }
    }"###;

    pub(crate) fn write_tokenizer_file(dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("tokenizer.json");
        std::fs::write(&path, TOKENIZER_JSON)?;
        Ok(path)
    }

    fn tokenizer() -> Result<BertPhraseTokenizer> {
        let dir = tempfile::tempdir()?;
        BertPhraseTokenizer::open(write_tokenizer_file(dir.path())?)
    }

    #[test]
    fn bert_layout() -> Result<()> {
        let tokenizer = tokenizer()?;
        let TokenizedPhrase { ids, mask } = tokenizer.tokenize("the car to the north", 10)?;

        assert_eq!(ids, vec![2, 4, 5, 6, 4, 7, 3, 0, 0, 0]);
        assert_eq!(mask, vec![1, 1, 1, 1, 1, 1, 1, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn word_pieces_and_unknown_words() -> Result<()> {
        let tokenizer = tokenizer()?;
        let TokenizedPhrase { ids, .. } = tokenizer.tokenize("Cars zebra", 6)?;
        assert_eq!(ids, vec![2, 5, 9, 1, 3, 0]);
        Ok(())
    }

    #[test]
    fn truncate_long_phrase() -> Result<()> {
        let tokenizer = tokenizer()?;
        let TokenizedPhrase { ids, mask } = tokenizer.tokenize("the car to the south", 4)?;

        assert_eq!(ids, vec![2, 4, 5, 3]);
        assert_eq!(mask, vec![1, 1, 1, 1]);
        Ok(())
    }

    #[test]
    fn empty_phrase() -> Result<()> {
        let tokenizer = tokenizer()?;
        let TokenizedPhrase { ids, mask } = tokenizer.tokenize("", 4)?;

        assert_eq!(ids, vec![2, 3, 0, 0]);
        assert_eq!(mask, vec![1, 1, 0, 0]);
        Ok(())
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        assert!(BertPhraseTokenizer::open(path).is_err());
    }
}

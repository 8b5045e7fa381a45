use graph_error::Result;

use crate::execution::RecordStream;
use crate::record::Record;
use crate::value::KeyTuple;

/// Buffers the entire input, then emits it ordered by the tuple of `keys`.
///
/// Uses a stable sort so that records sharing a key keep their relative
/// input order — downstream `reduce` depends on this for deterministic
/// grouping.
pub struct SortStream {
    input: Box<dyn RecordStream>,
    keys: Vec<String>,
    sorted: Option<std::vec::IntoIter<Record>>,
}

impl SortStream {
    pub fn new(input: Box<dyn RecordStream>, keys: Vec<String>) -> Self {
        SortStream {
            input,
            keys,
            sorted: None,
        }
    }

    fn materialize(&mut self) -> Result<()> {
        let mut all = Vec::new();
        while let Some(r) = self.input.next()? {
            all.push(r);
        }

        let mut keyed: Vec<(KeyTuple, Record)> = Vec::with_capacity(all.len());
        for r in all {
            let key = r.key_tuple(&self.keys)?;
            keyed.push((key, r));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        tracing::trace!(keys = ?self.keys, records = keyed.len(), "sort buffer ready");

        self.sorted = Some(keyed.into_iter().map(|(_, r)| r).collect::<Vec<_>>().into_iter());
        Ok(())
    }
}

impl RecordStream for SortStream {
    fn next(&mut self) -> Result<Option<Record>> {
        if self.sorted.is_none() {
            self.materialize()?;
        }
        Ok(self.sorted.as_mut().unwrap().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::VecStream;
    use crate::value::Value;

    #[test]
    fn sorts_by_key_and_is_stable_on_ties() {
        let input = VecStream::new(vec![
            Record::new().with("k", 1i64).with("tag", "first"),
            Record::new().with("k", 0i64).with("tag", "only"),
            Record::new().with("k", 1i64).with("tag", "second"),
        ]);
        let mut stream = SortStream::new(Box::new(input), vec!["k".to_string()]);
        let a = stream.next().unwrap().unwrap();
        let b = stream.next().unwrap().unwrap();
        let c = stream.next().unwrap().unwrap();
        assert_eq!(a.get("k"), Some(&Value::Int(0)));
        assert_eq!(b.get("tag"), Some(&Value::Str("first".into())));
        assert_eq!(c.get("tag"), Some(&Value::Str("second".into())));
    }

    #[test]
    fn missing_key_field_fails() {
        let input = VecStream::new(vec![Record::new().with("other", 1i64)]);
        let mut stream = SortStream::new(Box::new(input), vec!["k".to_string()]);
        let err = stream.next().unwrap_err();
        assert_eq!(err.kind(), graph_error::ErrorKind::MissingField);
    }
}

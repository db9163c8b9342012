use std::collections::VecDeque;

#[derive(Debug)]
pub enum CacheOperation {
    Put(u8, u8),
    Push(u8, u8),
    Get(u8),
    GetMut(u8, u8),
    Peek(u8),
    Iter,
}

impl<'a> arbitrary::Arbitrary<'a> for CacheOperation {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        match u.int_in_range(0..=5)? {
            0 => Ok(CacheOperation::Put(u.arbitrary()?, u.arbitrary()?)),
            1 => Ok(CacheOperation::Push(u.arbitrary()?, u.arbitrary()?)),
            2 => Ok(CacheOperation::Get(u.arbitrary()?)),
            3 => Ok(CacheOperation::GetMut(u.arbitrary()?, u.arbitrary()?)),
            4 => Ok(CacheOperation::Peek(u.arbitrary()?)),
            5 => Ok(CacheOperation::Iter),
            _ => unreachable!(),
        }
    }
}

/// Naive recency list, most recently used first.
#[derive(Debug, Default)]
pub struct Model {
    pub entries: VecDeque<(u8, u8)>,
}

impl Model {
    pub fn touch(&mut self, key: u8) -> Option<&mut u8> {
        let index = self.entries.iter().position(|(k, _)| *k == key)?;
        let entry = self.entries.remove(index)?;
        self.entries.push_front(entry);
        self.entries.front_mut().map(|(_, v)| v)
    }

    pub fn peek(&self, key: u8) -> Option<u8> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    pub fn push(&mut self, key: u8, value: u8, capacity: usize) -> Option<(u8, u8)> {
        if let Some(slot) = self.touch(key) {
            *slot = value;
            return None;
        }
        self.entries.push_front((key, value));
        if self.entries.len() > capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }
}

//! A process-global string interner.
//!
//! Rule names, production target-slot names, and diagnostic tokens are
//! compared and hashed far more often than they are displayed, so grammar
//! objects carry an [`IString`] (a `u32` token) instead of an owned `String`.
//! [`CachedString::to_token`] interns on first use; [`IString::to_string`]
//! resolves back through an explicit [`IStringStore`] handle so that callers
//! who only have a grammar object (and not the process-global lock) can
//! still print names.

use std::{
  collections::HashMap,
  sync::{Mutex, OnceLock},
};

fn global_store() -> &'static Mutex<Interner> {
  static STORE: OnceLock<Mutex<Interner>> = OnceLock::new();
  STORE.get_or_init(|| Mutex::new(Interner::default()))
}

#[derive(Default)]
struct Interner {
  strings: Vec<String>,
  lookup:  HashMap<String, u32>,
}

impl Interner {
  fn intern(&mut self, s: &str) -> u32 {
    if let Some(id) = self.lookup.get(s) {
      return *id;
    }
    let id = self.strings.len() as u32;
    self.strings.push(s.to_string());
    self.lookup.insert(s.to_string(), id);
    id
  }

  fn resolve(&self, id: u32) -> &str {
    self.strings.get(id as usize).map(|s| s.as_str()).unwrap_or("")
  }
}

/// A token referring to an interned string. Cheap to copy, compare, and hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct IString(u32);

impl Default for IString {
  fn default() -> Self {
    // The empty string is always interned first by `IStringStore::default`.
    IString(0)
  }
}

impl IString {
  /// Resolves this token to an owned `String` using the global store.
  ///
  /// `store` is accepted for API symmetry with other workbench types that
  /// carry their own store handle, but resolution always goes through the
  /// process-global interner since tokens are only ever minted there.
  pub fn to_string(&self, _store: &IStringStore) -> String {
    global_store().lock().unwrap().resolve(self.0).to_string()
  }

  pub fn as_u32(&self) -> u32 {
    self.0
  }
}

/// A cheap, `Clone`-able handle to the global interner. Grammar objects carry
/// one of these so that a future, non-global interner implementation can be
/// substituted without changing call sites.
#[derive(Clone, Debug)]
pub struct IStringStore;

impl Default for IStringStore {
  fn default() -> Self {
    // Ensure the empty string occupies token 0.
    global_store().lock().unwrap().intern("");
    IStringStore
  }
}

/// Anything that can be interned into an [`IString`].
pub trait CachedString {
  fn to_token(&self) -> IString;
}

impl CachedString for str {
  fn to_token(&self) -> IString {
    IString(global_store().lock().unwrap().intern(self))
  }
}

impl CachedString for String {
  fn to_token(&self) -> IString {
    self.as_str().to_token()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn round_trips_through_the_store() {
    let store = IStringStore::default();
    let a = "delimiter".to_token();
    let b = "delimiter".to_token();
    assert_eq!(a, b);
    assert_eq!(a.to_string(&store), "delimiter");
  }

  #[test]
  fn distinct_strings_get_distinct_tokens() {
    let store = IStringStore::default();
    let a = "Sentence".to_token();
    let b = "Inner".to_token();
    assert_ne!(a, b);
    assert_eq!(a.to_string(&store), "Sentence");
    assert_eq!(b.to_string(&store), "Inner");
  }
}

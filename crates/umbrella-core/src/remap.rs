//! Generated resource class remapping.
//!
//! Rewrites references to per-module `R` / `R$<type>` classes inside compiled
//! class files so that they point at the main module's namespace.
//!
//! # Implementation Note: constant pool rewriting
//! Every symbolic reference in a class file lives in its constant pool as a
//! `CONSTANT_Utf8` entry. Class entries point at an internal name
//! (`com/dep/R$drawable`) and descriptors or generic signatures embed class
//! names as `Lcom/dep/R$drawable;`. Rewriting those UTF-8 entries (and their
//! length prefixes) is enough to relocate every reference; everything after
//! the constant pool is copied verbatim because it only refers to entries by
//! index.
//!
//! String literals share the same UTF-8 entries. When an entry referenced by
//! a `CONSTANT_String` would change, the original text is appended to the pool
//! as a fresh entry and the string constant is pointed at it, so literals are
//! never altered.

use crate::error::{Result, UmbrellaError};
use std::borrow::Cow;
use umbrella_schema::{Namespace, RESERVED_NAMESPACES};

const MAGIC: u32 = 0xCAFE_BABE;

/// Low-level class file format error.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ClassFormatError {
    #[error("not a class file (bad magic)")]
    BadMagic,
    #[error("unexpected end of data at offset {0}")]
    Truncated(usize),
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },
    #[error("constant pool index {0} out of range")]
    BadIndex(u16),
    #[error("constant pool would exceed 65535 entries")]
    PoolOverflow,
    #[error("UTF-8 entry longer than 65535 bytes after remapping")]
    EntryTooLong,
}

/// Remaps generated resource class references into one namespace.
#[derive(Debug, Clone)]
pub struct Remapper {
    target: String,
}

impl Remapper {
    pub fn new(namespace: &Namespace) -> Self {
        Self {
            target: namespace.internal(),
        }
    }

    /// Target namespace in slash-separated form.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Remap one class file; `entry` names it in errors.
    pub fn remap<'a>(&self, entry: &str, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        remap_class(bytes, &self.target).map_err(|e| UmbrellaError::MalformedClass {
            entry: entry.to_string(),
            reason: e.to_string(),
        })
    }

    /// Remapped form of an internal name, or `None` when it stays as is.
    pub fn map_internal_name(&self, name: &str) -> Option<String> {
        map_internal_name(name, &self.target)
    }
}

/// Quick byte scan for `/R$` or `/R;`.
pub fn contains_r_reference(bytes: &[u8]) -> bool {
    bytes
        .windows(3)
        .any(|w| w[0] == b'/' && w[1] == b'R' && (w[2] == b'$' || w[2] == b';'))
}

/// Remapped form of an internal class name.
///
/// The left-most `/R$` boundary decides the package portion, so
/// `com/dep/R$string$Inner` becomes `<target>/R$string$Inner`.
pub fn map_internal_name(name: &str, target: &str) -> Option<String> {
    if RESERVED_NAMESPACES.iter().any(|p| name.starts_with(p)) {
        return None;
    }
    if let Some(rest) = name.strip_prefix(target) {
        if rest == "/R" || rest.starts_with("/R$") {
            return None;
        }
    }
    if let Some(idx) = name.find("/R$") {
        if idx > 0 {
            return Some(format!("{target}{}", &name[idx..]));
        }
    }
    if name.len() > 2 && name.ends_with("/R") {
        return Some(format!("{target}/R"));
    }
    None
}

/// Rewrite every generated resource class reference in `bytes` into
/// `target` (slash-separated). Class files without `/R$` or `/R;` are
/// returned untouched without being parsed.
pub fn remap_class<'a>(bytes: &'a [u8], target: &str) -> Result<Cow<'a, [u8]>, ClassFormatError> {
    if !contains_r_reference(bytes) {
        return Ok(Cow::Borrowed(bytes));
    }

    let pool = ConstantPool::parse(bytes)?;
    let mut rewritten: Vec<Option<String>> = vec![None; pool.entries.len()];
    let mut changed = false;

    for (idx, entry) in pool.entries.iter().enumerate() {
        let Entry::Utf8 { start, len } = *entry else {
            continue;
        };
        let usage = pool.usage[idx];
        if usage.module_or_package {
            continue;
        }
        let Ok(text) = std::str::from_utf8(&bytes[start..start + len]) else {
            continue;
        };
        let mapped = if usage.class_name && !text.starts_with('[') {
            map_internal_name(text, target)
        } else if looks_like_descriptor(text) {
            remap_signature(text, target).filter(|s| s != text)
        } else {
            None
        };
        if let Some(new_text) = mapped {
            if new_text.len() > u16::MAX as usize {
                return Err(ClassFormatError::EntryTooLong);
            }
            rewritten[idx] = Some(new_text);
            changed = true;
        }
    }

    if !changed {
        return Ok(Cow::Borrowed(bytes));
    }

    // Literals whose text changed get their own copy of the original text.
    let mut appended: Vec<(usize, u16)> = Vec::new();
    let mut next_index = pool.entries.len();
    for (idx, usage) in pool.usage.iter().enumerate() {
        if usage.string_literal && rewritten[idx].is_some() {
            let new_index = u16::try_from(next_index).map_err(|_| ClassFormatError::PoolOverflow)?;
            appended.push((idx, new_index));
            next_index += 1;
        }
    }
    let new_count = u16::try_from(next_index).map_err(|_| ClassFormatError::PoolOverflow)?;

    let mut out = Vec::with_capacity(bytes.len() + 64);
    out.extend_from_slice(&bytes[..8]);
    out.extend_from_slice(&new_count.to_be_bytes());

    for (idx, entry) in pool.entries.iter().enumerate() {
        match *entry {
            Entry::Empty => {}
            Entry::Utf8 { start, len } => {
                out.push(1);
                match &rewritten[idx] {
                    Some(text) => {
                        out.extend_from_slice(&(text.len() as u16).to_be_bytes());
                        out.extend_from_slice(text.as_bytes());
                    }
                    None => out.extend_from_slice(&bytes[start - 2..start + len]),
                }
            }
            Entry::String { start, utf8 } => {
                let target_index = appended
                    .iter()
                    .find(|(orig, _)| *orig == utf8 as usize)
                    .map_or(utf8, |(_, copy)| *copy);
                out.push(8);
                out.extend_from_slice(&target_index.to_be_bytes());
                debug_assert_eq!(bytes[start - 1], 8);
            }
            Entry::Other { start, end } => out.extend_from_slice(&bytes[start..end]),
        }
    }
    for (orig, _) in &appended {
        if let Entry::Utf8 { start, len } = pool.entries[*orig] {
            out.push(1);
            out.extend_from_slice(&bytes[start - 2..start + len]);
        }
    }
    out.extend_from_slice(&bytes[pool.end..]);
    Ok(Cow::Owned(out))
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    /// Index 0 and the second slot of long/double constants.
    Empty,
    /// `start` is the offset of the first content byte.
    Utf8 { start: usize, len: usize },
    /// `start` is the offset just past the tag byte.
    String { start: usize, utf8: u16 },
    /// Any other entry, copied verbatim including its tag.
    Other { start: usize, end: usize },
}

#[derive(Debug, Clone, Copy, Default)]
struct Usage {
    class_name: bool,
    string_literal: bool,
    module_or_package: bool,
}

struct ConstantPool {
    entries: Vec<Entry>,
    usage: Vec<Usage>,
    /// Offset of the first byte after the pool.
    end: usize,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], ClassFormatError> {
        let end = self.pos.checked_add(n).ok_or(ClassFormatError::Truncated(self.pos))?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(ClassFormatError::Truncated(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn u1(&mut self) -> Result<u8, ClassFormatError> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16, ClassFormatError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32, ClassFormatError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl ConstantPool {
    fn parse(bytes: &[u8]) -> Result<Self, ClassFormatError> {
        let mut r = Reader { bytes, pos: 0 };
        if r.u4()? != MAGIC {
            return Err(ClassFormatError::BadMagic);
        }
        r.take(4)?; // minor, major
        let count = r.u2()? as usize;

        let mut entries = vec![Entry::Empty; count.max(1)];
        let mut class_refs = Vec::new();
        let mut string_refs = Vec::new();
        let mut module_refs = Vec::new();

        let mut i = 1;
        while i < count {
            let start = r.pos;
            let tag = r.u1()?;
            let mut slots = 1;
            match tag {
                1 => {
                    let len = r.u2()? as usize;
                    let content = r.pos;
                    r.take(len)?;
                    entries[i] = Entry::Utf8 { start: content, len };
                }
                7 => {
                    class_refs.push(r.u2()?);
                    entries[i] = Entry::Other { start, end: r.pos };
                }
                8 => {
                    let utf8 = r.u2()?;
                    string_refs.push(utf8);
                    entries[i] = Entry::String { start: start + 1, utf8 };
                }
                19 | 20 => {
                    module_refs.push(r.u2()?);
                    entries[i] = Entry::Other { start, end: r.pos };
                }
                3 | 4 => {
                    r.take(4)?;
                    entries[i] = Entry::Other { start, end: r.pos };
                }
                5 | 6 => {
                    r.take(8)?;
                    entries[i] = Entry::Other { start, end: r.pos };
                    slots = 2;
                }
                9..=12 | 17 | 18 => {
                    r.take(4)?;
                    entries[i] = Entry::Other { start, end: r.pos };
                }
                15 => {
                    r.take(3)?;
                    entries[i] = Entry::Other { start, end: r.pos };
                }
                16 => {
                    r.take(2)?;
                    entries[i] = Entry::Other { start, end: r.pos };
                }
                other => {
                    return Err(ClassFormatError::UnknownTag {
                        tag: other,
                        index: i as u16,
                    });
                }
            }
            i += slots;
        }
        let mut usage = vec![Usage::default(); entries.len()];
        let mut mark = |refs: &[u16], f: fn(&mut Usage)| -> Result<(), ClassFormatError> {
            for &idx in refs {
                match entries.get(idx as usize) {
                    Some(Entry::Utf8 { .. }) => f(&mut usage[idx as usize]),
                    _ => return Err(ClassFormatError::BadIndex(idx)),
                }
            }
            Ok(())
        };
        mark(&class_refs, |u| u.class_name = true)?;
        mark(&string_refs, |u| u.string_literal = true)?;
        mark(&module_refs, |u| u.module_or_package = true)?;

        Ok(Self {
            entries,
            usage,
            end: r.pos,
        })
    }
}

fn looks_like_descriptor(text: &str) -> bool {
    text.starts_with('(')
        || text.starts_with('<')
        || text.starts_with('[')
        || (text.starts_with('L') && text.ends_with(';'))
}

/// Rewrite the class names inside a descriptor or generic signature.
/// Returns `None` when `text` does not parse as one.
fn remap_signature(text: &str, target: &str) -> Option<String> {
    let mut p = SignatureParser {
        s: text.as_bytes(),
        src: text,
        i: 0,
        out: String::with_capacity(text.len() + 16),
        target,
    };
    p.signature()?;
    Some(p.out)
}

struct SignatureParser<'a> {
    s: &'a [u8],
    src: &'a str,
    i: usize,
    out: String,
    target: &'a str,
}

impl SignatureParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.s.get(self.i).copied()
    }

    fn copy(&mut self, n: usize) -> Option<()> {
        let chunk = self.src.get(self.i..self.i + n)?;
        self.out.push_str(chunk);
        self.i += n;
        Some(())
    }

    fn expect(&mut self, c: u8) -> Option<()> {
        (self.peek()? == c).then_some(())?;
        self.copy(1)
    }

    /// Copy an identifier up to (not including) any byte in `stops`.
    fn ident(&mut self, stops: &[u8]) -> Option<&str> {
        let start = self.i;
        while let Some(c) = self.peek() {
            if stops.contains(&c) {
                break;
            }
            self.i += 1;
        }
        if self.i == start {
            return None;
        }
        self.src.get(start..self.i)
    }

    fn signature(&mut self) -> Option<()> {
        if self.peek()? == b'<' {
            self.formal_type_parameters()?;
        }
        if self.peek()? == b'(' {
            self.copy(1)?;
            while self.peek()? != b')' {
                self.java_type()?;
            }
            self.copy(1)?;
            self.java_type()?;
            while self.peek() == Some(b'^') {
                self.copy(1)?;
                self.java_type()?;
            }
        } else {
            while self.i < self.s.len() {
                self.java_type()?;
            }
        }
        (self.i == self.s.len()).then_some(())
    }

    fn formal_type_parameters(&mut self) -> Option<()> {
        self.expect(b'<')?;
        while self.peek()? != b'>' {
            let name = self.ident(b":>;")?.to_string();
            self.out.push_str(&name);
            while self.peek()? == b':' {
                self.copy(1)?;
                if matches!(self.peek()?, b'L' | b'T' | b'[') {
                    self.java_type()?;
                }
            }
        }
        self.copy(1)
    }

    fn java_type(&mut self) -> Option<()> {
        match self.peek()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V' | b'*' => self.copy(1),
            b'[' | b'+' | b'-' => {
                self.copy(1)?;
                self.java_type()
            }
            b'T' => {
                self.copy(1)?;
                let name = self.ident(b";")?.to_string();
                self.out.push_str(&name);
                self.expect(b';')
            }
            b'L' => self.class_type(),
            _ => None,
        }
    }

    fn class_type(&mut self) -> Option<()> {
        self.expect(b'L')?;
        let name = self.ident(b";<.")?.to_string();
        match map_internal_name(&name, self.target) {
            Some(mapped) => self.out.push_str(&mapped),
            None => self.out.push_str(&name),
        }
        loop {
            match self.peek()? {
                b'<' => {
                    self.copy(1)?;
                    while self.peek()? != b'>' {
                        self.java_type()?;
                    }
                    self.copy(1)?;
                }
                b'.' => {
                    self.copy(1)?;
                    let inner = self.ident(b";<.")?.to_string();
                    self.out.push_str(&inner);
                }
                b';' => return self.copy(1),
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Minimal class file builder: magic, version, pool, then a fixed tail.
    struct ClassBuilder {
        pool: Vec<Vec<u8>>,
    }

    impl ClassBuilder {
        fn new() -> Self {
            Self { pool: Vec::new() }
        }

        fn utf8(&mut self, s: &str) -> u16 {
            let mut e = vec![1];
            e.extend_from_slice(&(s.len() as u16).to_be_bytes());
            e.extend_from_slice(s.as_bytes());
            self.pool.push(e);
            self.pool.len() as u16
        }

        fn class(&mut self, name: &str) -> u16 {
            let n = self.utf8(name);
            self.pool.push([vec![7], n.to_be_bytes().to_vec()].concat());
            self.pool.len() as u16
        }

        fn string(&mut self, utf8: u16) -> u16 {
            self.pool.push([vec![8], utf8.to_be_bytes().to_vec()].concat());
            self.pool.len() as u16
        }

        fn long(&mut self, v: i64) -> u16 {
            self.pool.push([vec![5], v.to_be_bytes().to_vec()].concat());
            // Long constants take two slots.
            self.pool.push(Vec::new());
            self.pool.len() as u16 - 1
        }

        fn build(&self) -> Vec<u8> {
            let mut out = MAGIC.to_be_bytes().to_vec();
            out.extend_from_slice(&[0, 0, 0, 52]);
            out.extend_from_slice(&((self.pool.len() + 1) as u16).to_be_bytes());
            for e in &self.pool {
                out.extend_from_slice(e);
            }
            out.extend_from_slice(&[0x00, 0x21, 0x00, 0x01, 0xAB, 0xCD]);
            out
        }
    }

    fn utf8_strings(bytes: &[u8]) -> Vec<String> {
        let pool = ConstantPool::parse(bytes).unwrap();
        pool.entries
            .iter()
            .filter_map(|e| match *e {
                Entry::Utf8 { start, len } => {
                    Some(String::from_utf8(bytes[start..start + len].to_vec()).unwrap())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn maps_dependency_r_class() {
        assert_eq!(
            map_internal_name("com/dep/R$drawable", "com/main").as_deref(),
            Some("com/main/R$drawable")
        );
        assert_eq!(
            map_internal_name("com/dep/R", "com/main").as_deref(),
            Some("com/main/R")
        );
    }

    #[test]
    fn reserved_and_own_namespace_are_untouched() {
        assert_eq!(map_internal_name("android/R$id", "com/main"), None);
        assert_eq!(map_internal_name("androidx/appcompat/R$id", "com/main"), None);
        assert_eq!(
            map_internal_name("com/google/android/material/R$attr", "com/main"),
            None
        );
        assert_eq!(map_internal_name("com/main/R$string", "com/main"), None);
        assert_eq!(map_internal_name("com/dep/Router", "com/main"), None);
    }

    #[test]
    fn left_most_boundary_wins() {
        assert_eq!(
            map_internal_name("com/dep/R$id/R$x", "com/main").as_deref(),
            Some("com/main/R$id/R$x")
        );
    }

    #[test]
    fn descriptors_and_signatures_are_rewritten() {
        assert_eq!(
            remap_signature("(Lcom/dep/R$id;I)Landroid/R$id;", "com/main").as_deref(),
            Some("(Lcom/main/R$id;I)Landroid/R$id;")
        );
        assert_eq!(
            remap_signature(
                "<T:Ljava/lang/Object;>(Ljava/util/List<+Lcom/dep/R$id;>;)TT;",
                "com/main"
            )
            .as_deref(),
            Some("<T:Ljava/lang/Object;>(Ljava/util/List<+Lcom/main/R$id;>;)TT;")
        );
        assert_eq!(
            remap_signature("[[Lcom/dep/R;", "com/main").as_deref(),
            Some("[[Lcom/main/R;")
        );
        assert_eq!(remap_signature("not a descriptor", "com/main"), None);
    }

    #[test]
    fn inner_class_suffix_is_copied() {
        assert_eq!(
            remap_signature("Lcom/x/Outer<TT;>.R;", "com/main").as_deref(),
            Some("Lcom/x/Outer<TT;>.R;")
        );
    }

    #[test]
    fn class_without_r_reference_is_returned_as_is() {
        let mut b = ClassBuilder::new();
        b.class("com/dep/Foo");
        let bytes = b.build();
        let out = remap_class(&bytes, "com/main").unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn rewrites_class_and_descriptor_entries() {
        let mut b = ClassBuilder::new();
        b.class("com/dep/Foo");
        b.class("com/dep/R$drawable");
        b.class("android/R$id");
        b.utf8("(Lcom/dep/R$string;)V");
        b.long(42);
        let bytes = b.build();

        let out = remap_class(&bytes, "com/main").unwrap();
        let strings = utf8_strings(&out);
        assert!(strings.contains(&"com/main/R$drawable".to_string()));
        assert!(strings.contains(&"android/R$id".to_string()));
        assert!(strings.contains(&"(Lcom/main/R$string;)V".to_string()));
        assert!(!strings.iter().any(|s| s.contains("com/dep/R")));
        // Tail after the pool survives.
        assert_eq!(&out[out.len() - 6..], &[0x00, 0x21, 0x00, 0x01, 0xAB, 0xCD]);
    }

    #[test]
    fn string_literals_keep_their_text() {
        let mut b = ClassBuilder::new();
        let shared = b.utf8("Lcom/dep/R$id;");
        b.string(shared);
        let bytes = b.build();

        let out = remap_class(&bytes, "com/main").unwrap();
        let pool = ConstantPool::parse(&out).unwrap();
        // One extra entry holds the literal's original text.
        assert_eq!(pool.entries.len(), 4);
        let Entry::String { utf8, .. } = pool.entries[2] else {
            panic!("expected string entry");
        };
        let Entry::Utf8 { start, len } = pool.entries[utf8 as usize] else {
            panic!("expected utf8 entry");
        };
        assert_eq!(&out[start..start + len], b"Lcom/dep/R$id;");
        assert!(utf8_strings(&out).contains(&"Lcom/main/R$id;".to_string()));
    }

    #[test]
    fn truncated_class_is_an_error() {
        let mut b = ClassBuilder::new();
        b.class("com/dep/R$id");
        let bytes = b.build();
        let err = remap_class(&bytes[..bytes.len() - 8], "com/main").unwrap_err();
        assert!(matches!(err, ClassFormatError::Truncated(_)));
    }

    #[test]
    fn bad_magic_with_marker_is_an_error() {
        let bytes = b"garbage /R$ bytes".to_vec();
        assert_eq!(
            remap_class(&bytes, "com/main").unwrap_err(),
            ClassFormatError::BadMagic
        );
    }

    #[test]
    fn remapper_names_entry_in_error() {
        let remapper = Remapper::new(&Namespace::new("com.main"));
        assert_eq!(remapper.target(), "com/main");
        let err = remapper.remap("com/dep/Broken.class", b"xx/R;").unwrap_err();
        assert!(err.to_string().contains("com/dep/Broken.class"));
    }

    proptest! {
        #[test]
        fn bytes_without_marker_are_identical(data in prop::collection::vec(any::<u8>(), 0..512)) {
            prop_assume!(!contains_r_reference(&data));
            let out = remap_class(&data, "com/main").unwrap();
            prop_assert_eq!(out.as_ref(), data.as_slice());
        }

        #[test]
        fn reserved_prefixes_are_never_remapped(
            prefix in prop::sample::select(RESERVED_NAMESPACES.to_vec()),
            rest in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
            kind in "[a-z]{1,8}",
        ) {
            let name = format!("{prefix}{rest}/R${kind}");
            prop_assert_eq!(map_internal_name(&name, "com/main"), None);
        }
    }
}

//! Manifest reconciliation.
//!
//! Dependency manifests are folded one at a time into the main manifest. The
//! main manifest's `package` attribute is stripped before each fold and put
//! back on the merged root, so the namespace always comes from the main
//! module.
//!
//! The structural merge follows library-merge semantics:
//! - missing root namespace declarations are added,
//! - children match by element name plus `android:name` (singletons such as
//!   `application` match by name alone) and merge recursively,
//! - unmatched elements are appended, unnamed ones only if no structurally
//!   equal element already exists,
//! - differing attribute values conflict unless the main element lists the
//!   attribute in `tools:replace` or carries `tools:node="replace"`,
//! - `tools:node="remove"` on a main element drops the matching dependency
//!   element.
//!
//! Prefixes are the conventional `android:` and `tools:`.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{IoContext, Result, UmbrellaError};

/// File name of the manifest at the root of an archive.
pub const MANIFEST_FILE: &str = "AndroidManifest.xml";

const PACKAGE: &str = "package";
const ANDROID_NAME: &str = "android:name";
const MIN_SDK: &str = "android:minSdkVersion";
const TOOLS_NODE: &str = "tools:node";
const TOOLS_REPLACE: &str = "tools:replace";
const TOOLS_REMOVE: &str = "tools:remove";
const SINGLETONS: [&str; 4] = ["application", "uses-sdk", "supports-screens", "queries"];
const INDENT: &str = "    ";

/// A node in the manifest tree.
#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    /// Escaped text exactly as it appeared in the source.
    Text(String),
    /// Comments, CDATA and processing instructions, kept verbatim.
    Other(Event<'static>),
}

/// An element with its attributes in source order.
///
/// Attribute values are stored escaped, exactly as written, so untouched
/// attributes serialize back byte for byte.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

fn unescape_lossy(raw: &str) -> Cow<'_, str> {
    quick_xml::escape::unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

impl Element {
    fn from_start(e: &BytesStart<'_>) -> std::result::Result<Self, quick_xml::Error> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            attrs.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            ));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
        })
    }

    /// Unescaped attribute value.
    pub fn attr(&self, key: &str) -> Option<String> {
        self.raw_attr(key).map(|v| unescape_lossy(v).into_owned())
    }

    fn raw_attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set_raw_attr(&mut self, key: &str, raw: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = raw.to_string(),
            None => self.attrs.push((key.to_string(), raw.to_string())),
        }
    }

    /// Set an attribute, escaping `value`.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        self.set_raw_attr(key, &quick_xml::escape::escape(value));
    }

    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|(k, _)| k.as_str())
    }

    /// Child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    fn tools_node(&self) -> Option<String> {
        self.attr(TOOLS_NODE)
    }

    fn tools_list(&self, key: &str) -> HashSet<String> {
        self.attr(key)
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Identity used to pair main and dependency children. `None` for
    /// unnamed, non-singleton elements.
    fn match_key(&self) -> Option<(String, Option<String>)> {
        if SINGLETONS.contains(&self.name.as_str()) {
            return Some((self.name.clone(), None));
        }
        self.attr(ANDROID_NAME)
            .map(|n| (self.name.clone(), Some(n)))
    }

    fn find_child_mut(&mut self, key: &(String, Option<String>)) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.match_key().as_ref() == Some(key) => Some(e),
            _ => None,
        })
    }

    /// Equality that ignores whitespace, comments and attribute order.
    fn structurally_equal(&self, other: &Element) -> bool {
        if self.name != other.name || self.attrs.len() != other.attrs.len() {
            return false;
        }
        let attrs_match = self
            .attrs
            .iter()
            .all(|(k, v)| other.raw_attr(k).is_some_and(|o| unescape_lossy(o) == unescape_lossy(v)));
        if !attrs_match {
            return false;
        }
        let mine: Vec<_> = self.elements().collect();
        let theirs: Vec<_> = other.elements().collect();
        mine.len() == theirs.len()
            && mine.iter().zip(&theirs).all(|(a, b)| a.structurally_equal(b))
    }

    /// Append a child after the last element, reusing the existing
    /// indentation.
    fn append_child(&mut self, child: Element, depth: usize) {
        let last = self
            .children
            .iter()
            .rposition(|n| matches!(n, Node::Element(_)));
        match last {
            Some(idx) => {
                let indent = idx
                    .checked_sub(1)
                    .and_then(|i| match &self.children[i] {
                        Node::Text(t) if t.trim().is_empty() => Some(t.clone()),
                        _ => None,
                    });
                let mut at = idx + 1;
                if let Some(indent) = indent {
                    self.children.insert(at, Node::Text(indent));
                    at += 1;
                }
                self.children.insert(at, Node::Element(child));
            }
            None => {
                self.children
                    .retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
                self.children
                    .push(Node::Text(format!("\n{}", INDENT.repeat(depth + 1))));
                self.children.push(Node::Element(child));
                self.children
                    .push(Node::Text(format!("\n{}", INDENT.repeat(depth))));
            }
        }
    }

    fn write(&self, w: &mut Writer<Vec<u8>>) -> std::result::Result<(), quick_xml::Error> {
        let mut start = BytesStart::new(self.name.as_str());
        for (k, v) in &self.attrs {
            start.push_attribute((k.as_bytes(), v.as_bytes()));
        }
        if self.children.is_empty() {
            return w.write_event(Event::Empty(start)).map_err(Into::into);
        }
        w.write_event(Event::Start(start))
            .map_err(Into::<quick_xml::Error>::into)?;
        for child in &self.children {
            match child {
                Node::Element(e) => e.write(w)?,
                Node::Text(t) => w
                    .write_event(Event::Text(BytesText::from_escaped(t.as_str())))
                    .map_err(Into::<quick_xml::Error>::into)?,
                Node::Other(ev) => w
                    .write_event(ev.clone())
                    .map_err(Into::<quick_xml::Error>::into)?,
            }
        }
        w.write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(Into::into)
    }
}

/// A parsed manifest: prolog events, the root element, trailing events.
#[derive(Debug, Clone)]
pub struct ManifestDocument {
    prolog: Vec<Event<'static>>,
    pub root: Element,
    epilog: Vec<Event<'static>>,
}

impl ManifestDocument {
    /// Parse manifest text; `context` names the document in errors.
    pub fn parse(text: &str, context: &str) -> Result<Self> {
        let xml_err = |source| UmbrellaError::Xml {
            context: context.to_string(),
            source,
        };
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();

        loop {
            let event = reader.read_event().map_err(xml_err)?;
            match event {
                Event::Start(e) => stack.push(Element::from_start(&e).map_err(xml_err)?),
                Event::Empty(e) => {
                    let el = Element::from_start(&e).map_err(xml_err)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(el)),
                        None => root = Some(el),
                    }
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or_else(|| UmbrellaError::ManifestMerge {
                        module: context.to_string(),
                        reason: "unbalanced end tag".into(),
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(el)),
                        None => root = Some(el),
                    }
                }
                Event::Eof => break,
                Event::Text(t) if !stack.is_empty() => {
                    let raw = String::from_utf8_lossy(&t).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(raw));
                    }
                }
                other => {
                    let owned = other.into_owned();
                    match (stack.last_mut(), root.is_some()) {
                        (Some(parent), _) => parent.children.push(Node::Other(owned)),
                        (None, false) => prolog.push(owned),
                        (None, true) => epilog.push(owned),
                    }
                }
            }
        }

        let root = root.ok_or_else(|| UmbrellaError::ManifestMerge {
            module: context.to_string(),
            reason: "document has no root element".into(),
        })?;
        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    pub fn to_xml(&self) -> Result<String> {
        let xml_err = |source| UmbrellaError::Xml {
            context: "manifest serialization".into(),
            source,
        };
        let mut w = Writer::new(Vec::new());
        for ev in &self.prolog {
            w.write_event(ev.clone())
                .map_err(|e| xml_err(e.into()))?;
        }
        self.root.write(&mut w).map_err(xml_err)?;
        for ev in &self.epilog {
            w.write_event(ev.clone())
                .map_err(|e| xml_err(e.into()))?;
        }
        Ok(String::from_utf8_lossy(&w.into_inner()).into_owned())
    }

    /// Overlay `dep` onto this document. `namespace`, when non-empty, becomes
    /// the root `package` attribute of the result.
    pub fn merge(&mut self, dep: &ManifestDocument, namespace: &str) -> std::result::Result<(), String> {
        merge_element(&mut self.root, &dep.root, 0, true)?;
        if !namespace.is_empty() {
            set_package(&mut self.root, namespace);
        }
        Ok(())
    }
}

fn set_package(root: &mut Element, namespace: &str) {
    let escaped = quick_xml::escape::escape(namespace).into_owned();
    if let Some((_, v)) = root.attrs.iter_mut().find(|(k, _)| k == PACKAGE) {
        *v = escaped;
        return;
    }
    let at = root
        .attrs
        .iter()
        .rposition(|(k, _)| k.starts_with("xmlns"))
        .map_or(0, |i| i + 1);
    root.attrs.insert(at, (PACKAGE.to_string(), escaped));
}

fn merge_element(main: &mut Element, dep: &Element, depth: usize, is_root: bool) -> std::result::Result<(), String> {
    if dep.name == "uses-sdk" {
        merge_uses_sdk(main, dep)?;
    } else {
        merge_attributes(main, dep, is_root)?;
    }

    let removed_all: HashSet<String> = main
        .elements()
        .filter(|e| e.tools_node().as_deref() == Some("removeAll"))
        .map(|e| e.name.clone())
        .collect();

    for child in dep.elements() {
        if removed_all.contains(&child.name) {
            continue;
        }
        if matches!(child.tools_node().as_deref(), Some("remove" | "removeAll")) {
            continue;
        }
        match child.match_key() {
            Some(key) => match main.find_child_mut(&key) {
                Some(existing) => match existing.tools_node().as_deref() {
                    Some("remove" | "replace") => {
                        debug!("Keeping main <{}> over dependency", existing.name);
                    }
                    _ => merge_element(existing, child, depth + 1, false)?,
                },
                None => main.append_child(child.clone(), depth),
            },
            None => {
                if !main.elements().any(|e| e.structurally_equal(child)) {
                    main.append_child(child.clone(), depth);
                }
            }
        }
    }
    Ok(())
}

fn merge_attributes(main: &mut Element, dep: &Element, is_root: bool) -> std::result::Result<(), String> {
    let replace_node = main.tools_node().as_deref() == Some("replace");
    let replaced = main.tools_list(TOOLS_REPLACE);
    let removed = main.tools_list(TOOLS_REMOVE);

    for (key, raw) in &dep.attrs {
        if key.starts_with("tools:") || (is_root && key == PACKAGE) || removed.contains(key) {
            continue;
        }
        match main.raw_attr(key) {
            Some(existing) => {
                let same = unescape_lossy(existing) == unescape_lossy(raw);
                if !same && !replace_node && !replaced.contains(key) {
                    return Err(format!(
                        "Attribute {}@{} value=({}) is also present with value=({}). Suggestion: add 'tools:replace=\"{}\"' to <{}> element",
                        main.name,
                        key,
                        unescape_lossy(existing),
                        unescape_lossy(raw),
                        key,
                        main.name
                    ));
                }
            }
            None if !replace_node => main.set_raw_attr(key, raw),
            None => {}
        }
    }
    Ok(())
}

fn merge_uses_sdk(main: &mut Element, dep: &Element) -> std::result::Result<(), String> {
    let parse = |v: Option<String>| v.and_then(|s| s.trim().parse::<u32>().ok());
    match (parse(main.attr(MIN_SDK)), parse(dep.attr(MIN_SDK))) {
        (Some(ours), Some(theirs)) if theirs > ours => Err(format!(
            "uses-sdk:minSdkVersion {ours} cannot be smaller than version {theirs} declared in library"
        )),
        (None, Some(_)) => {
            if let Some(raw) = dep.raw_attr(MIN_SDK) {
                main.set_raw_attr(MIN_SDK, raw);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Root `package` attribute of a manifest, if present and non-blank.
pub fn package_name(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) | Event::Empty(e) => {
                let root = Element::from_start(&e).ok()?;
                return root.attr(PACKAGE).filter(|p| !p.trim().is_empty());
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

/// Remove the root `package` attribute from manifest text, returning the
/// cleaned text and the removed value. Text without one is returned as is.
pub fn strip_package_attribute(text: &str) -> (String, Option<String>) {
    let Some(pkg) = package_name(text) else {
        return (text.to_string(), None);
    };
    let escaped = regex::escape(&quick_xml::escape::escape(&pkg));
    let pattern = format!(r#"\s+package\s*=\s*(?:"{escaped}"|'{escaped}')"#);
    match Regex::new(&pattern) {
        Ok(re) => (re.replacen(text, 1, "").into_owned(), Some(pkg)),
        Err(_) => (text.to_string(), Some(pkg)),
    }
}

/// How a dependency manifest ended up in the main layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// No main manifest existed; the dependency's became the main one.
    Copied,
    Merged,
}

/// Fold one dependency manifest into the main manifest in place.
///
/// # Errors
///
/// Returns [`UmbrellaError::ManifestMerge`] naming `module` when the
/// documents cannot be merged.
pub fn fold_manifest(main: &Path, dep: &Path, module: &str) -> Result<FoldOutcome> {
    let namespace = if main.exists() {
        let text = fs::read_to_string(main).at(main)?;
        let (cleaned, pkg) = strip_package_attribute(&text);
        fs::write(main, &cleaned).at(main)?;
        pkg.unwrap_or_default()
    } else {
        warn!("Main manifest does not exist at: {}", main.display());
        String::new()
    };

    if !main.exists() {
        if let Some(parent) = main.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        fs::copy(dep, main).at(main)?;
        return Ok(FoldOutcome::Copied);
    }

    let main_text = fs::read_to_string(main).at(main)?;
    let dep_text = fs::read_to_string(dep).at(dep)?;
    let mut doc = ManifestDocument::parse(&main_text, &main.display().to_string())?;
    let overlay = ManifestDocument::parse(&dep_text, module)?;
    doc.merge(&overlay, &namespace)
        .map_err(|reason| UmbrellaError::ManifestMerge {
            module: module.to_string(),
            reason,
        })?;
    fs::write(main, doc.to_xml()?).at(main)?;
    debug!("Merged manifest of '{}' into {}", module, main.display());
    Ok(FoldOutcome::Merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.main">

    <uses-sdk android:minSdkVersion="24" />

    <application android:label="Main">
        <activity android:name="com.main.MainActivity" />
    </application>
</manifest>
"#;

    fn merged(main: &str, dep: &str, ns: &str) -> std::result::Result<ManifestDocument, String> {
        let mut doc = ManifestDocument::parse(main, "main").unwrap();
        let overlay = ManifestDocument::parse(dep, "dep").unwrap();
        doc.merge(&overlay, ns)?;
        Ok(doc)
    }

    #[test]
    fn strip_package_returns_value() {
        let (cleaned, pkg) = strip_package_attribute(MAIN);
        assert_eq!(pkg.as_deref(), Some("com.main"));
        assert!(!cleaned.contains("package="));
        assert!(cleaned.contains("xmlns:android"));
    }

    #[test]
    fn strip_without_package_is_identity() {
        let text = "<manifest><application/></manifest>";
        assert_eq!(strip_package_attribute(text), (text.to_string(), None));
        assert_eq!(package_name("<manifest package=\"  \"/>"), None);
    }

    #[test]
    fn untouched_document_round_trips() {
        let text = "<?xml version=\"1.0\"?>\n<!-- keep -->\n<manifest a=\"1 &amp; 2\">\n    <application/>\n</manifest>\n";
        let doc = ManifestDocument::parse(text, "main").unwrap();
        assert_eq!(doc.to_xml().unwrap(), text);
        assert_eq!(doc.root.attr("a").as_deref(), Some("1 & 2"));
    }

    #[test]
    fn named_children_are_appended_with_indentation() {
        let dep = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.dep">
    <uses-permission android:name="android.permission.INTERNET" />
    <application>
        <activity android:name="com.dep.LoginActivity" />
    </application>
</manifest>"#;
        let doc = merged(MAIN, dep, "com.main").unwrap();
        let xml = doc.to_xml().unwrap();
        assert!(xml.contains("<uses-permission android:name=\"android.permission.INTERNET\"/>"));
        assert!(xml.contains("\n        <activity android:name=\"com.dep.LoginActivity\"/>"));
        assert!(xml.contains("package=\"com.main\""));
        assert!(!xml.contains("com.dep\""));
        assert_eq!(doc.root.elements().filter(|e| e.name == "application").count(), 1);
    }

    #[test]
    fn differing_attribute_conflicts() {
        let dep = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
    <application android:label="Dep" />
</manifest>"#;
        let err = merged(MAIN, dep, "").unwrap_err();
        assert!(err.contains("application@android:label"));
        assert!(err.contains("Main"));
        assert!(err.contains("Dep"));
    }

    #[test]
    fn tools_replace_keeps_main_value() {
        let main = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" xmlns:tools="http://schemas.android.com/tools">
    <application android:label="Main" tools:replace="android:label" />
</manifest>"#;
        let dep = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
    <application android:label="Dep" android:allowBackup="false" />
</manifest>"#;
        let doc = merged(main, dep, "").unwrap();
        let app = doc.root.elements().next().unwrap();
        assert_eq!(app.attr("android:label").as_deref(), Some("Main"));
        assert_eq!(app.attr("android:allowBackup").as_deref(), Some("false"));
    }

    #[test]
    fn tools_node_remove_drops_dependency_element() {
        let main = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" xmlns:tools="http://schemas.android.com/tools">
    <uses-permission android:name="android.permission.CAMERA" tools:node="remove" />
</manifest>"#;
        let dep = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
    <uses-permission android:name="android.permission.CAMERA" android:maxSdkVersion="28" />
</manifest>"#;
        let doc = merged(main, dep, "").unwrap();
        let perm = doc.root.elements().next().unwrap();
        assert_eq!(perm.attr("android:maxSdkVersion"), None);
        assert_eq!(doc.root.elements().count(), 1);
    }

    #[test]
    fn higher_library_min_sdk_conflicts() {
        let dep = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
    <uses-sdk android:minSdkVersion="26" />
</manifest>"#;
        let err = merged(MAIN, dep, "").unwrap_err();
        assert!(err.contains("minSdkVersion 24"));

        let lower = dep.replace("26", "21");
        assert!(merged(MAIN, &lower, "").is_ok());
    }

    #[test]
    fn equal_unnamed_elements_are_not_duplicated() {
        let main = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
    <application>
        <activity android:name="A">
            <intent-filter><action android:name="VIEW" /></intent-filter>
        </activity>
    </application>
</manifest>"#;
        let dep = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"><application><activity android:name="A"><intent-filter>
  <action android:name="VIEW"/>
</intent-filter><intent-filter><action android:name="EDIT"/></intent-filter></activity></application></manifest>"#;
        let doc = merged(main, dep, "").unwrap();
        let app = doc.root.elements().next().unwrap();
        let activity = app.elements().next().unwrap();
        assert_eq!(activity.elements().count(), 2);
    }

    #[test]
    fn missing_namespace_declarations_are_added() {
        let main = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"/>"#;
        let dep = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" xmlns:tools="http://schemas.android.com/tools"/>"#;
        let doc = merged(main, dep, "com.main").unwrap();
        let names: Vec<_> = doc.root.attr_names().collect();
        assert_eq!(names, vec!["xmlns:android", "xmlns:tools", "package"]);
    }

    #[test]
    fn fold_copies_when_main_missing() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("merged/AndroidManifest.xml");
        let dep = dir.path().join("dep.xml");
        fs::write(&dep, "<manifest package=\"com.dep\"/>").unwrap();

        assert_eq!(fold_manifest(&main, &dep, "dep").unwrap(), FoldOutcome::Copied);
        assert_eq!(fs::read_to_string(&main).unwrap(), "<manifest package=\"com.dep\"/>");
    }

    #[test]
    fn fold_merges_and_restores_package() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("AndroidManifest.xml");
        let dep = dir.path().join("dep.xml");
        fs::write(&main, MAIN).unwrap();
        fs::write(
            &dep,
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="com.dep">
    <uses-permission android:name="android.permission.INTERNET"/>
</manifest>"#,
        )
        .unwrap();

        assert_eq!(fold_manifest(&main, &dep, "dep").unwrap(), FoldOutcome::Merged);
        let text = fs::read_to_string(&main).unwrap();
        assert_eq!(package_name(&text).as_deref(), Some("com.main"));
        assert!(text.contains("android.permission.INTERNET"));

        // A second fold sees the restored package again.
        assert_eq!(fold_manifest(&main, &dep, "dep").unwrap(), FoldOutcome::Merged);
        let again = fs::read_to_string(&main).unwrap();
        assert_eq!(again.matches("android.permission.INTERNET").count(), 1);
    }

    #[test]
    fn fold_conflict_names_module() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("AndroidManifest.xml");
        let dep = dir.path().join("dep.xml");
        fs::write(&main, MAIN).unwrap();
        fs::write(
            &dep,
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"><application android:label="Other"/></manifest>"#,
        )
        .unwrap();
        let err = fold_manifest(&main, &dep, "feature:login").unwrap_err();
        assert!(matches!(err, UmbrellaError::ManifestMerge { ref module, .. } if module == "feature:login"));
    }
}

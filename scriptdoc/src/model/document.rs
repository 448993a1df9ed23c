//! Document tree: paragraphs grouped by structural nodes
//!
//! Paragraphs are addressed by their reading-order index. Structural groups
//! (folders, acts, sequences) organise paragraphs without being styled as
//! one. Every mutation bumps the document revision and reports the
//! [`EditRange`] it touched, which the pagination engine uses to limit
//! relayout.

use super::attributes::ParagraphAttributes;
use super::error::ModelError;
use super::kind::{ParagraphKind, WritingForm};
use super::paragraph::Paragraph;
use std::ops::Range;
use std::sync::Arc;

/// Kind of structural grouping node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Folder,
    Act,
    Sequence,
}

impl GroupKind {
    /// Stable identifier
    pub fn slug(self) -> &'static str {
        match self {
            GroupKind::Folder => "folder",
            GroupKind::Act => "act",
            GroupKind::Sequence => "sequence",
        }
    }
}

/// Structural node organising paragraphs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralGroup {
    /// Kind of group
    pub kind: GroupKind,
    /// Group title
    pub title: String,
    /// Child nodes
    pub children: Vec<Node>,
}

/// One node of the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Paragraph(Paragraph),
    Group(StructuralGroup),
}

/// One title page entry (`Title`, `Credit`, `Author`, `Draft date`, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleEntry {
    /// Key as written by the source
    pub key: String,
    /// Value; may span several lines
    pub value: String,
}

/// Title page fields, kept in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitlePage {
    /// Entries in source order
    pub entries: Vec<TitleEntry>,
}

impl TitlePage {
    /// Look up an entry by case-insensitive key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key.eq_ignore_ascii_case(key))
            .map(|e| e.value.as_str())
    }

    /// Set or add an entry
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|e| e.key.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.value = value,
            None => self.entries.push(TitleEntry {
                key: key.to_string(),
                value,
            }),
        }
    }

    /// Document title if present
    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    /// Whether the title page has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Entry of the cast / resource list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastMember {
    pub name: String,
    pub description: String,
    pub age: Option<String>,
    pub gender: Option<String>,
}

/// Region of reading-order indices touched by a mutation
///
/// `removed` paragraphs starting at `start` were replaced by `inserted` new
/// ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditRange {
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl EditRange {
    /// Range of new indices covered by the edit
    pub fn new_range(&self) -> Range<usize> {
        self.start..self.start + self.inserted
    }
}

/// A writing-form document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    form: WritingForm,
    nodes: Vec<Node>,
    revision: u64,
    /// Title page fields
    pub title_page: TitlePage,
    /// Cast / resource list
    pub cast: Vec<CastMember>,
}

impl Document {
    /// Create an empty document
    pub fn new(form: WritingForm) -> Self {
        Self {
            form,
            nodes: Vec::new(),
            revision: 0,
            title_page: TitlePage::default(),
            cast: Vec::new(),
        }
    }

    /// Writing form of the document
    pub fn form(&self) -> WritingForm {
        self.form
    }

    /// Monotonic revision, bumped by every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Top-level nodes
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Paragraphs in reading order
    pub fn paragraphs(&self) -> ParagraphIter<'_> {
        ParagraphIter {
            stack: vec![self.nodes.iter()],
        }
    }

    /// Number of paragraphs
    pub fn len(&self) -> usize {
        self.paragraphs().count()
    }

    /// Whether the document holds no paragraphs
    pub fn is_empty(&self) -> bool {
        self.paragraphs().next().is_none()
    }

    /// Paragraph at a reading-order index
    pub fn paragraph(&self, index: usize) -> Option<&Paragraph> {
        self.paragraphs().nth(index)
    }

    /// Deep, immutable copy for worker threads
    pub fn snapshot(&self) -> Arc<Document> {
        Arc::new(self.clone())
    }

    /// Total word count
    pub fn word_count(&self) -> usize {
        self.paragraphs().map(Paragraph::word_count).sum()
    }

    /// Index range of the scene enclosing `index`
    ///
    /// The scene starts at the closest scene-start paragraph at or before
    /// `index` (or the document start) and ends before the next one.
    pub fn enclosing_scene(&self, index: usize) -> Range<usize> {
        let kinds: Vec<ParagraphKind> = self.paragraphs().map(Paragraph::kind).collect();
        let index = index.min(kinds.len());
        let start = kinds[..index]
            .iter()
            .rposition(|k| k.is_scene_start())
            .unwrap_or(0);
        let start = if kinds.get(index).is_some_and(|k| k.is_scene_start()) {
            index
        } else {
            start
        };
        let end = kinds
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, k)| k.is_scene_start())
            .map(|(i, _)| i)
            .unwrap_or(kinds.len());
        start..end
    }

    /// Plain text of a paragraph range, one paragraph per line
    pub fn text_range(&self, range: Range<usize>) -> String {
        self.paragraphs()
            .skip(range.start)
            .take(range.end.saturating_sub(range.start))
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn check_form(&self, paragraph: &Paragraph) -> Result<(), ModelError> {
        if paragraph.form() != self.form {
            return Err(ModelError::FormMismatch {
                expected: self.form,
                found: paragraph.form(),
            });
        }
        Ok(())
    }

    fn out_of_range(&self, index: usize) -> ModelError {
        ModelError::IndexOutOfRange {
            index,
            len: self.len(),
        }
    }

    /// Tree path of the paragraph at `index`
    fn locate(&self, index: usize) -> Option<Vec<usize>> {
        fn walk(nodes: &[Node], target: usize, seen: &mut usize, path: &mut Vec<usize>) -> bool {
            for (i, node) in nodes.iter().enumerate() {
                path.push(i);
                match node {
                    Node::Paragraph(_) => {
                        if *seen == target {
                            return true;
                        }
                        *seen += 1;
                    }
                    Node::Group(group) => {
                        if walk(&group.children, target, seen, path) {
                            return true;
                        }
                    }
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        let mut seen = 0;
        walk(&self.nodes, index, &mut seen, &mut path).then_some(path)
    }

    fn container_mut<'a>(nodes: &'a mut Vec<Node>, prefix: &[usize]) -> Option<&'a mut Vec<Node>> {
        let mut current = nodes;
        for &i in prefix {
            current = match current.get_mut(i)? {
                Node::Group(group) => &mut group.children,
                Node::Paragraph(_) => return None,
            };
        }
        Some(current)
    }

    fn paragraph_mut(&mut self, index: usize) -> Result<&mut Paragraph, ModelError> {
        let path = self.locate(index).ok_or_else(|| self.out_of_range(index))?;
        let (last, prefix) = path.split_last().ok_or_else(|| self.out_of_range(index))?;
        let len = self.len();
        let container = Self::container_mut(&mut self.nodes, prefix)
            .ok_or(ModelError::IndexOutOfRange { index, len })?;
        match container.get_mut(*last) {
            Some(Node::Paragraph(p)) => Ok(p),
            _ => Err(ModelError::IndexOutOfRange { index, len }),
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    /// Insert paragraphs before `index` (or append when `index == len`)
    ///
    /// Appending places the paragraphs in the container of the last
    /// paragraph, so text typed at the end of an act stays in that act.
    pub fn insert_many(
        &mut self,
        index: usize,
        paragraphs: Vec<Paragraph>,
    ) -> Result<EditRange, ModelError> {
        for p in &paragraphs {
            self.check_form(p)?;
        }
        let len = self.len();
        if index > len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        let count = paragraphs.len();

        let (prefix, position) = if index < len {
            let path = self.locate(index).ok_or(ModelError::IndexOutOfRange { index, len })?;
            let (last, prefix) = path
                .split_last()
                .ok_or(ModelError::IndexOutOfRange { index, len })?;
            (prefix.to_vec(), *last)
        } else if len > 0 {
            let path = self
                .locate(len - 1)
                .ok_or(ModelError::IndexOutOfRange { index, len })?;
            let (last, prefix) = path
                .split_last()
                .ok_or(ModelError::IndexOutOfRange { index, len })?;
            (prefix.to_vec(), *last + 1)
        } else {
            (Vec::new(), self.nodes.len())
        };

        let container = Self::container_mut(&mut self.nodes, &prefix)
            .ok_or(ModelError::IndexOutOfRange { index, len })?;
        for (offset, p) in paragraphs.into_iter().enumerate() {
            container.insert(position + offset, Node::Paragraph(p));
        }
        self.bump();
        Ok(EditRange {
            start: index,
            removed: 0,
            inserted: count,
        })
    }

    /// Insert one paragraph before `index`
    pub fn insert(&mut self, index: usize, paragraph: Paragraph) -> Result<EditRange, ModelError> {
        self.insert_many(index, vec![paragraph])
    }

    /// Append a paragraph at the end
    pub fn push(&mut self, paragraph: Paragraph) -> Result<EditRange, ModelError> {
        let len = self.len();
        self.insert(len, paragraph)
    }

    /// Remove the paragraph at `index`
    pub fn remove(&mut self, index: usize) -> Result<(Paragraph, EditRange), ModelError> {
        let len = self.len();
        let path = self.locate(index).ok_or(ModelError::IndexOutOfRange { index, len })?;
        let (last, prefix) = path
            .split_last()
            .ok_or(ModelError::IndexOutOfRange { index, len })?;
        let container = Self::container_mut(&mut self.nodes, prefix)
            .ok_or(ModelError::IndexOutOfRange { index, len })?;
        let removed = match container.remove(*last) {
            Node::Paragraph(p) => p,
            node => {
                container.insert(*last, node);
                return Err(ModelError::IndexOutOfRange { index, len });
            }
        };
        self.bump();
        Ok((
            removed,
            EditRange {
                start: index,
                removed: 1,
                inserted: 0,
            },
        ))
    }

    /// Replace the paragraph at `index`
    pub fn replace(&mut self, index: usize, paragraph: Paragraph) -> Result<EditRange, ModelError> {
        self.check_form(&paragraph)?;
        *self.paragraph_mut(index)? = paragraph;
        self.bump();
        Ok(EditRange {
            start: index,
            removed: 1,
            inserted: 1,
        })
    }

    /// Split the paragraph at `index` at a character offset
    pub fn split(&mut self, index: usize, offset: usize) -> Result<EditRange, ModelError> {
        let (first, second) = self
            .paragraph(index)
            .ok_or_else(|| self.out_of_range(index))?
            .split_at(offset)?;
        *self.paragraph_mut(index)? = first;
        self.insert(index + 1, second)?;
        Ok(EditRange {
            start: index,
            removed: 1,
            inserted: 2,
        })
    }

    /// Merge the paragraph at `index + 1` into the one at `index`
    pub fn merge(&mut self, index: usize) -> Result<EditRange, ModelError> {
        let len = self.len();
        if index + 1 >= len {
            return Err(ModelError::IndexOutOfRange {
                index: index + 1,
                len,
            });
        }
        let first = self.paragraph(index).ok_or_else(|| self.out_of_range(index))?;
        let second = self
            .paragraph(index + 1)
            .ok_or_else(|| self.out_of_range(index + 1))?;
        let merged = first.merge(second)?;
        self.remove(index + 1)?;
        *self.paragraph_mut(index)? = merged;
        Ok(EditRange {
            start: index,
            removed: 2,
            inserted: 1,
        })
    }

    /// Change the kind of the paragraph at `index`
    pub fn retype(&mut self, index: usize, kind: ParagraphKind) -> Result<EditRange, ModelError> {
        self.paragraph_mut(index)?.retype(kind)?;
        self.bump();
        Ok(EditRange {
            start: index,
            removed: 1,
            inserted: 1,
        })
    }

    /// Replace the text of the paragraph at `index`
    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> Result<EditRange, ModelError> {
        self.paragraph_mut(index)?.set_text(text);
        self.bump();
        Ok(EditRange {
            start: index,
            removed: 1,
            inserted: 1,
        })
    }

    /// Replace the attributes of the paragraph at `index`
    pub fn set_attributes(
        &mut self,
        index: usize,
        attributes: ParagraphAttributes,
    ) -> Result<EditRange, ModelError> {
        self.paragraph_mut(index)?.attributes = attributes;
        self.bump();
        Ok(EditRange {
            start: index,
            removed: 1,
            inserted: 1,
        })
    }

    /// Apply `f` to every paragraph in `range`; returns how many changed
    ///
    /// Used by bulk normalisation passes. Bumps the revision once if anything
    /// changed.
    pub fn update_range(
        &mut self,
        range: Range<usize>,
        mut f: impl FnMut(usize, &Paragraph) -> Option<Paragraph>,
    ) -> usize {
        fn walk(
            nodes: &mut [Node],
            range: &Range<usize>,
            seen: &mut usize,
            changed: &mut usize,
            f: &mut dyn FnMut(usize, &Paragraph) -> Option<Paragraph>,
        ) {
            for node in nodes.iter_mut() {
                if *seen >= range.end {
                    return;
                }
                match node {
                    Node::Paragraph(p) => {
                        if range.contains(seen) {
                            if let Some(updated) = f(*seen, p) {
                                if updated != *p && updated.form() == p.form() {
                                    *p = updated;
                                    *changed += 1;
                                }
                            }
                        }
                        *seen += 1;
                    }
                    Node::Group(group) => walk(&mut group.children, range, seen, changed, f),
                }
            }
        }

        let mut seen = 0;
        let mut changed = 0;
        walk(&mut self.nodes, &range, &mut seen, &mut changed, &mut f);
        if changed > 0 {
            self.bump();
        }
        changed
    }
}

/// Depth-first iterator over paragraphs in reading order
pub struct ParagraphIter<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for ParagraphIter<'a> {
    type Item = &'a Paragraph;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Node::Paragraph(p)) => return Some(p),
                Some(Node::Group(group)) => self.stack.push(group.children.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Builder for constructing a document in reading order
///
/// Importers push paragraphs and open/close structural groups; groups left
/// open are closed by [`DocumentBuilder::build`].
pub struct DocumentBuilder {
    form: WritingForm,
    title_page: TitlePage,
    cast: Vec<CastMember>,
    root: Vec<Node>,
    open_groups: Vec<StructuralGroup>,
}

impl DocumentBuilder {
    /// Create a new document builder
    pub fn new(form: WritingForm) -> Self {
        Self {
            form,
            title_page: TitlePage::default(),
            cast: Vec::new(),
            root: Vec::new(),
            open_groups: Vec::new(),
        }
    }

    /// Writing form being built
    pub fn form(&self) -> WritingForm {
        self.form
    }

    /// Mutable access to the title page
    pub fn title_page_mut(&mut self) -> &mut TitlePage {
        &mut self.title_page
    }

    /// Add a cast member
    pub fn add_cast_member(&mut self, member: CastMember) {
        self.cast.push(member);
    }

    fn current(&mut self) -> &mut Vec<Node> {
        match self.open_groups.last_mut() {
            Some(group) => &mut group.children,
            None => &mut self.root,
        }
    }

    /// Add a paragraph to the current group
    pub fn push(&mut self, paragraph: Paragraph) -> Result<(), ModelError> {
        if paragraph.form() != self.form {
            return Err(ModelError::FormMismatch {
                expected: self.form,
                found: paragraph.form(),
            });
        }
        self.current().push(Node::Paragraph(paragraph));
        Ok(())
    }

    /// Number of currently open groups
    pub fn depth(&self) -> usize {
        self.open_groups.len()
    }

    /// Open a structural group; following paragraphs go inside it
    pub fn open_group(&mut self, kind: GroupKind, title: impl Into<String>) {
        self.open_groups.push(StructuralGroup {
            kind,
            title: title.into(),
            children: Vec::new(),
        });
    }

    /// Close the innermost open group
    pub fn close_group(&mut self) {
        match self.open_groups.pop() {
            Some(group) => self.current().push(Node::Group(group)),
            None => log::warn!("Ignoring close of a structural group that was never opened"),
        }
    }

    /// Finish the document
    pub fn build(mut self) -> Document {
        while !self.open_groups.is_empty() {
            self.close_group();
        }
        Document {
            form: self.form,
            nodes: self.root,
            revision: 0,
            title_page: self.title_page,
            cast: self.cast,
        }
    }
}

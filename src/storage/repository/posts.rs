// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post repository.
//!
//! Posts carry a mutable `order` used for manual sorting. New posts are
//! appended after the author's last post; reorder rewrites the whole
//! sequence of one author inside a single write transaction.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use crate::storage::database::{
    decode, encode, next_id, CryptoplaceDb, StoreError, StoreResult, POSTS,
};

/// Post persisted in the `posts` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredPost {
    pub id: u64,
    pub author_id: u64,
    pub title: String,
    pub content: Option<String>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied by `PATCH /posts/{id}`.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Move the element at `source` so that it ends up at `target`.
///
/// Equivalent to removing it and reinserting it at `target` in the
/// shortened list. Both indices must be within `0..items.len()`.
pub fn move_item<T>(items: &mut Vec<T>, source: usize, target: usize) -> StoreResult<()> {
    let len = items.len();
    if source >= len || target >= len {
        return Err(StoreError::InvalidInput(format!(
            "Index out of range: source {source}, target {target}, length {len}"
        )));
    }
    let item = items.remove(source);
    items.insert(target, item);
    Ok(())
}

fn sort_posts(posts: &mut [StoredPost]) {
    posts.sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
}

/// Read every post matching `author_id` from an open write transaction.
fn author_posts_in(txn: &WriteTransaction, author_id: u64) -> StoreResult<Vec<StoredPost>> {
    let table = txn.open_table(POSTS)?;
    let mut posts = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        let post: StoredPost = decode(value.value())?;
        if post.author_id == author_id {
            posts.push(post);
        }
    }
    sort_posts(&mut posts);
    Ok(posts)
}

/// Repository for posts.
pub struct PostRepository<'a> {
    db: &'a CryptoplaceDb,
}

impl<'a> PostRepository<'a> {
    pub fn new(db: &'a CryptoplaceDb) -> Self {
        Self { db }
    }

    /// Create a post at the end of the author's sequence.
    pub fn create(
        &self,
        author_id: u64,
        title: String,
        content: Option<String>,
    ) -> StoreResult<StoredPost> {
        let write_txn = self.db.inner().begin_write()?;
        let last_order = author_posts_in(&write_txn, author_id)?
            .iter()
            .map(|p| p.order)
            .max()
            .unwrap_or(0);

        let now = Utc::now();
        let post = StoredPost {
            id: next_id(&write_txn, "posts")?,
            author_id,
            title,
            content,
            order: last_order + 1,
            created_at: now,
            updated_at: now,
        };
        {
            let mut table = write_txn.open_table(POSTS)?;
            table.insert(post.id, encode(&post)?.as_slice())?;
        }
        write_txn.commit()?;

        tracing::debug!(post_id = post.id, author_id, "Post created");
        Ok(post)
    }

    /// Get a post by id.
    pub fn get(&self, post_id: u64) -> StoreResult<StoredPost> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(POSTS)?;
        match table.get(post_id)? {
            Some(value) => decode(value.value()),
            None => Err(StoreError::NotFound(format!("Post {post_id}"))),
        }
    }

    /// List posts ordered by `(order, id)`, optionally restricted to one author.
    pub fn list(&self, author_id: Option<u64>) -> StoreResult<Vec<StoredPost>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(POSTS)?;
        let mut posts = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let post: StoredPost = decode(value.value())?;
            if author_id.is_none_or(|id| post.author_id == id) {
                posts.push(post);
            }
        }
        sort_posts(&mut posts);
        Ok(posts)
    }

    /// Apply a partial update.
    pub fn update(&self, post_id: u64, changes: PostChanges) -> StoreResult<StoredPost> {
        let write_txn = self.db.inner().begin_write()?;
        let post = {
            let mut table = write_txn.open_table(POSTS)?;
            let bytes = table.get(post_id)?.map(|v| v.value().to_vec());
            let Some(bytes) = bytes else {
                return Err(StoreError::NotFound(format!("Post {post_id}")));
            };
            let mut post: StoredPost = decode(&bytes)?;
            if let Some(title) = changes.title {
                post.title = title;
            }
            if let Some(content) = changes.content {
                post.content = Some(content);
            }
            post.updated_at = Utc::now();
            table.insert(post_id, encode(&post)?.as_slice())?;
            post
        };
        write_txn.commit()?;
        Ok(post)
    }

    /// Delete a post, returning the removed record.
    pub fn delete(&self, post_id: u64) -> StoreResult<StoredPost> {
        let write_txn = self.db.inner().begin_write()?;
        let post = {
            let mut table = write_txn.open_table(POSTS)?;
            let removed = table.remove(post_id)?.map(|v| v.value().to_vec());
            match removed {
                Some(bytes) => decode::<StoredPost>(&bytes)?,
                None => return Err(StoreError::NotFound(format!("Post {post_id}"))),
            }
        };
        write_txn.commit()?;

        tracing::debug!(post_id, "Post deleted");
        Ok(post)
    }

    /// Move one of the author's posts from `source` to `target` and renumber
    /// the author's posts `1..=n`.
    ///
    /// The read, move and rewrite happen inside one write transaction.
    pub fn reorder(
        &self,
        author_id: u64,
        source: usize,
        target: usize,
    ) -> StoreResult<Vec<StoredPost>> {
        let write_txn = self.db.inner().begin_write()?;
        let mut posts = author_posts_in(&write_txn, author_id)?;
        move_item(&mut posts, source, target)?;

        let now = Utc::now();
        {
            let mut table = write_txn.open_table(POSTS)?;
            for (index, post) in posts.iter_mut().enumerate() {
                let order = index as i64 + 1;
                if post.order != order {
                    post.order = order;
                    post.updated_at = now;
                }
                table.insert(post.id, encode(&*post)?.as_slice())?;
            }
        }
        write_txn.commit()?;

        tracing::info!(author_id, source, target, count = posts.len(), "Posts reordered");
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::test_support::temp_db;

    fn titles(posts: &[StoredPost]) -> Vec<&str> {
        posts.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn move_item_forward_and_backward() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        move_item(&mut items, 0, 2).unwrap();
        assert_eq!(items, vec!['b', 'c', 'a', 'd']);

        move_item(&mut items, 3, 0).unwrap();
        assert_eq!(items, vec!['d', 'b', 'c', 'a']);

        move_item(&mut items, 1, 1).unwrap();
        assert_eq!(items, vec!['d', 'b', 'c', 'a']);
    }

    #[test]
    fn move_item_rejects_out_of_range() {
        let mut items = vec![1, 2, 3];
        assert!(matches!(
            move_item(&mut items, 3, 0),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            move_item(&mut items, 0, 3),
            Err(StoreError::InvalidInput(_))
        ));
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn create_appends_per_author() {
        let (db, _dir) = temp_db();
        let repo = PostRepository::new(&db);

        let a = repo.create(1, "a".into(), None).unwrap();
        let b = repo.create(1, "b".into(), Some("body".into())).unwrap();
        let other = repo.create(2, "x".into(), None).unwrap();

        assert_eq!(a.order, 1);
        assert_eq!(b.order, 2);
        assert_eq!(other.order, 1);
        assert_eq!(repo.list(None).unwrap().len(), 3);
        assert_eq!(titles(&repo.list(Some(1)).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn reorder_three_posts() {
        let (db, _dir) = temp_db();
        let repo = PostRepository::new(&db);
        for title in ["a", "b", "c"] {
            repo.create(7, title.into(), None).unwrap();
        }

        let reordered = repo.reorder(7, 0, 2).unwrap();
        assert_eq!(titles(&reordered), vec!["b", "c", "a"]);
        assert_eq!(
            reordered.iter().map(|p| p.order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let persisted = repo.list(Some(7)).unwrap();
        assert_eq!(titles(&persisted), vec!["b", "c", "a"]);
    }

    #[test]
    fn reorder_out_of_range_leaves_posts_untouched() {
        let (db, _dir) = temp_db();
        let repo = PostRepository::new(&db);
        repo.create(7, "a".into(), None).unwrap();
        repo.create(7, "b".into(), None).unwrap();

        let err = repo.reorder(7, 0, 5).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(titles(&repo.list(Some(7)).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn reorder_only_touches_callers_posts() {
        let (db, _dir) = temp_db();
        let repo = PostRepository::new(&db);
        repo.create(1, "mine-1".into(), None).unwrap();
        let theirs = repo.create(2, "theirs".into(), None).unwrap();
        repo.create(1, "mine-2".into(), None).unwrap();

        repo.reorder(1, 1, 0).unwrap();
        assert_eq!(titles(&repo.list(Some(1)).unwrap()), vec!["mine-2", "mine-1"]);
        assert_eq!(repo.get(theirs.id).unwrap(), theirs);
    }

    #[test]
    fn update_and_delete() {
        let (db, _dir) = temp_db();
        let repo = PostRepository::new(&db);
        let post = repo.create(1, "draft".into(), None).unwrap();

        let updated = repo
            .update(
                post.id,
                PostChanges {
                    title: Some("final".into()),
                    content: Some("text".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.title, "final");
        assert_eq!(updated.content.as_deref(), Some("text"));
        assert_eq!(updated.order, post.order);

        let removed = repo.delete(post.id).unwrap();
        assert_eq!(removed.id, post.id);
        assert!(matches!(repo.get(post.id), Err(StoreError::NotFound(_))));
        assert!(matches!(repo.delete(post.id), Err(StoreError::NotFound(_))));
    }
}

//! Assembly of `PostView`s from joined post rows and batch-loaded relations.

use domains::{CommentView, DomainResult, PostRecord, PostView, VoteView};

use crate::loader::{BatchLoader, CommentsByPost, VotesByPost};

#[derive(Clone)]
pub struct PostAssembler {
    loader: BatchLoader,
}

impl PostAssembler {
    pub fn new(loader: BatchLoader) -> Self {
        Self { loader }
    }

    pub async fn assemble_one(&self, record: &PostRecord) -> DomainResult<PostView> {
        let ids = [record.post.id.clone()];
        let (comments, votes) = self.loader.load_for(&ids).await?;
        Ok(attach(record, &comments, &votes))
    }

    /// One comments batch and one votes batch for the whole slice, however
    /// many posts it holds. Do not loop `assemble_one` instead.
    pub async fn assemble_many(&self, records: &[PostRecord]) -> DomainResult<Vec<PostView>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = records.iter().map(|r| r.post.id.clone()).collect();
        let (comments, votes) = self.loader.load_for(&ids).await?;
        Ok(records
            .iter()
            .map(|record| attach(record, &comments, &votes))
            .collect())
    }
}

fn attach(record: &PostRecord, comments: &CommentsByPost, votes: &VotesByPost) -> PostView {
    let mut view = PostView::without_relations(record);
    if let Some(rows) = comments.get(&record.post.id) {
        view.comments = rows.iter().map(CommentView::from).collect();
    }
    if let Some(rows) = votes.get(&record.post.id) {
        view.votes = rows.iter().map(VoteView::from).collect();
    }
    view
}

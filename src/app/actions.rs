use crate::comments::{Comment, CommentStore, Persisted};
use crate::config::PageOptions;
use crate::share::{self, Platform};

pub struct ActionDispatcher<'a> {
    comments: &'a CommentStore,
    page: &'a PageOptions,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(comments: &'a CommentStore, page: &'a PageOptions) -> Self {
        Self { comments, page }
    }

    pub fn post_comment(&self, post_id: u32, comment: &Comment) -> Persisted {
        let persisted = self.comments.append(post_id, comment);
        tracing::info!(post_id, comment_id = comment.id, ?persisted, "comment posted");
        persisted
    }

    pub fn comment_count(&self, post_id: u32) -> usize {
        self.comments.count(post_id)
    }

    pub fn share_link(&self, platform: Platform) -> String {
        share::share_url(platform, &self.page.url, &self.page.title)
    }
}

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// A published post. Post content is trusted static data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u32,
    pub title: String,
    pub category: String,
    pub date: String,
    pub image: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    posts: Vec<Post>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            posts: vec![
                Post {
                    id: 1,
                    title: "The Future of Web Development: Trends to Watch in 2024".into(),
                    category: "technology".into(),
                    date: "January 15, 2024".into(),
                    image: "https://images.unsplash.com/photo-1461749280684-dccba630e2f6?w=800&h=400&fit=crop".into(),
                    excerpt: "Explore the latest trends shaping web development in 2024, from AI-powered tools to serverless architecture.".into(),
                },
                Post {
                    id: 2,
                    title: "Machine Learning in Everyday Applications: Beyond the Hype".into(),
                    category: "ai".into(),
                    date: "February 8, 2024".into(),
                    image: "https://images.unsplash.com/photo-1555255707-c07966088b7b?w=800&h=400&fit=crop".into(),
                    excerpt: "Discover how machine learning is quietly revolutionizing everyday applications and user experiences.".into(),
                },
                Post {
                    id: 3,
                    title: "Digital Minimalism: Finding Balance in a Connected World".into(),
                    category: "lifestyle".into(),
                    date: "March 3, 2024".into(),
                    image: "https://images.unsplash.com/photo-1516321318423-f06f85e504b3?w=800&h=400&fit=crop".into(),
                    excerpt: "Learn how to adopt digital minimalism principles for a more intentional relationship with technology.".into(),
                },
            ],
        }
    }

    pub fn from_posts(posts: Vec<Post>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(posts.len());
        for post in &posts {
            if !seen.insert(post.id) {
                bail!("duplicate post id {}", post.id);
            }
            if post.category.trim().is_empty() {
                bail!("post {} has an empty category", post.id);
            }
        }
        Ok(Self { posts })
    }

    /// Loads a catalog from a TOML file holding a `[[posts]]` array.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let file: CatalogFile = toml::from_str(&raw)
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        if file.posts.is_empty() {
            bail!("catalog {} contains no posts", path.display());
        }
        Self::from_posts(file.posts)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, id: u32) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.posts.iter().map(|post| post.id)
    }

    /// Distinct categories in first-seen catalog order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.posts
            .iter()
            .filter(|post| seen.insert(post.category.as_str()))
            .map(|post| post.category.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn builtin_catalog_has_three_posts_in_order() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(catalog.categories(), vec!["technology", "ai", "lifestyle"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut posts = Catalog::builtin().posts().to_vec();
        posts[1].id = 1;
        let err = Catalog::from_posts(posts).unwrap_err();
        assert!(err.to_string().contains("duplicate post id 1"));
    }

    #[test]
    fn loads_posts_from_toml() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"
[[posts]]
id = 7
title = "Field Notes"
category = "travel"
date = "April 1, 2024"
image = "https://example.com/a.jpg"
excerpt = "Short trip."
"#
        )?;
        let catalog = Catalog::load(file.path())?;
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(7).map(|p| p.title.as_str()), Some("Field Notes"));
        Ok(())
    }
}

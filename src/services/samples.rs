//! Sample content served when no store is configured.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::{Post, PostWithRelations};

/// Source of placeholder posts for the public read paths.
pub trait SampleContent: Send + Sync {
    /// Sample posts, newest first
    fn sample_posts(&self) -> Vec<PostWithRelations>;
}

/// Built-in welcome posts
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSamples;

struct Sample {
    slug: &'static str,
    title: &'static str,
    subtitle: &'static str,
    date: (i32, u32, u32),
    excerpt: &'static str,
    featured_image: &'static str,
    view_count: i64,
    content: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        slug: "typescript-tips",
        title: "Practical TypeScript Tips",
        subtitle: "Getting more out of the type system",
        date: (2024, 1, 3),
        excerpt: "A handful of TypeScript techniques that pay off in everyday work.",
        featured_image: "https://images.unsplash.com/photo-1516116216624-53e6977beab8?w=800&h=400&fit=crop",
        view_count: 89,
        content: "<h2>Type inference</h2>\
            <p>Let the compiler infer what it can and annotate only the boundaries.</p>\
            <h2>Generics</h2>\
            <p>Generics keep reusable functions and components type safe.</p>\
            <h2>Utility types</h2>\
            <p><code>Partial</code>, <code>Pick</code> and <code>Omit</code> remove a lot of boilerplate.</p>",
    },
    Sample {
        slug: "nextjs-mui-setup",
        title: "Building a Blog with Next.js and MUI",
        subtitle: "A modern blog from scratch",
        date: (2024, 1, 2),
        excerpt: "How this blog's front end is put together with Next.js and Material UI.",
        featured_image: "https://images.unsplash.com/photo-1633356122544-f134324a6cee?w=800&h=400&fit=crop",
        view_count: 256,
        content: "<h2>Stack</h2>\
            <ul><li><strong>Next.js</strong> with the App Router</li>\
            <li><strong>Material UI</strong> components</li>\
            <li><strong>TypeScript</strong> everywhere</li></ul>\
            <h2>Theme</h2>\
            <p>A single theme provider switches between light and dark modes.</p>",
    },
    Sample {
        slug: "welcome-to-my-blog",
        title: "Welcome to My Blog",
        subtitle: "Notes on technology and ideas",
        date: (2024, 1, 1),
        excerpt: "The first post: why this blog exists and what comes next.",
        featured_image: "https://images.unsplash.com/photo-1499750310107-5fef28a66643?w=800&h=400&fit=crop",
        view_count: 128,
        content: "<h2>Welcome</h2>\
            <p>This is where I write about programming, projects and the occasional book.</p>\
            <h2>What's next</h2>\
            <p>New posts will land regularly. Suggestions are always welcome.</p>",
    },
];

impl Sample {
    fn to_post(&self) -> Option<PostWithRelations> {
        let (year, month, day) = self.date;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let timestamp = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));

        Some(PostWithRelations {
            post: Post {
                slug: self.slug.to_string(),
                title: self.title.to_string(),
                subtitle: Some(self.subtitle.to_string()),
                date,
                excerpt: self.excerpt.to_string(),
                content: self.content.to_string(),
                markdown_content: None,
                featured_image: Some(self.featured_image.to_string()),
                view_count: self.view_count,
                like_count: 0,
                category_id: None,
                published: true,
                created_at: timestamp,
                updated_at: timestamp,
            },
            category: None,
            tags: Vec::new(),
        })
    }
}

impl SampleContent for StaticSamples {
    fn sample_posts(&self) -> Vec<PostWithRelations> {
        SAMPLES.iter().filter_map(Sample::to_post).collect()
    }
}

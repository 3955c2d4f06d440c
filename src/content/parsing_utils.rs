/// Drops HTML comments from markdown text. An unterminated comment hides
/// the rest of the text, as it would in a browser.
pub fn remove_comments(md_post: &str) -> String {
    let mut res: String = String::new();
    let mut slice = Some(md_post);

    let start_comment = "<!--";
    let end_comment = "-->";

    while let Some(block) = slice {
        let md_buf: &str = match block.find(start_comment) {
            Some(start) => {
                let to_keep: &str = &block[0..start];

                let next: &str = &block[(start + start_comment.len())..];
                slice = next.find(end_comment)
                    .map(|end| &next[(end + end_comment.len())..]);

                to_keep
            }
            None => {
                slice = None;
                block
            }
        };
        res.push_str(md_buf);
    }

    res
}

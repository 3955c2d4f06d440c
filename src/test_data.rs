#[cfg(test)]
pub const POST_DATA: &str = r#"---
title: "Docker bind mounts vs volumes"
date: 2024-05-18T10:30:00+02:00
draft: false
authors: ["yen"]
categories: ["Containers"]
tags: ["docker", "storage"]
summary: "When to reach for each mount type"
readTime: "9 min"
---

# Docker bind mounts vs volumes

A bind mount maps a host path straight into the container. See the
[CDK streaming stack](/cdk-streaming-stack) for a real deployment.

```yaml
volumes:
  - ./data:/var/lib/data
```
"#;

#[cfg(test)]
pub const SEPARATOR: &str = "\n<|RELATED_DOC_SEP-magic-0f9c2d|>\n";

#[cfg(test)]
pub fn valid_post(title: &str) -> String {
    format!("---
title: \"{}\"
date: 2024-01-01T00:00:00Z
authors: [\"yen\"]
tags: [\"notes\"]
---

Body of {}.
", title, title)
}

#[cfg(test)]
pub fn missing_front_matter_post() -> String {
    "# A post without metadata\n\nThe author forgot the front matter.\n".to_string()
}

//! Default world configuration: identity constants and the seeded tree.
//!
//! The seed mirrors a small training machine: a populated home directory,
//! system files under `/etc` and `/var/log`, a world-writable `/tmp` with
//! aged files for the time-based search exercises.

use crate::core::time::{self, DAY_MS, HOUR_MS, MINUTE_MS};
use crate::models::FsNode;

/// Default acting user.
pub const DEFAULT_USERNAME: &str = "user";

/// Hostname shown in the prompt.
pub const DEFAULT_HOSTNAME: &str = "termgym";

/// Home directory of the default user.
pub const DEFAULT_HOME: &str = "/home/user";

/// Build the default seed tree.
pub fn seed_tree() -> FsNode {
    let now = time::now_millis();

    let documents = FsNode::dir(
        "documents",
        vec![
            FsNode::file(
                "notes.txt",
                "Welcome to the training shell!\nThis file holds your first notes.\n\nTip: use \"cat\" to read a file.\nUse \"ls\" to list a directory's contents.\nUse \"cd\" to move around.",
            ),
            FsNode::file(
                "todo.txt",
                "1. Learn the ls command\n2. Learn the cd command\n3. Read files with cat\n4. Create files and directories\n5. Master grep and find\n6. Become a shell expert!",
            ),
            FsNode::file(
                "report.txt",
                "Mission report\n==============\nDate: 2024-01-15\nStatus: In progress\n\nGoal: master the basic shell commands.\n\nProgress:\n- Navigation: in progress\n- Files: to do\n- Search: to do\n- Permissions: to do",
            ),
            FsNode::file(
                "bonuses.txt",
                "HR bonuses - Confidential\nAlice: 1200\nBob: 900\nCharlie: 600",
            )
            .with_mode("rw-rw----")
            .with_group("hr"),
            FsNode::dir(
                "projects",
                vec![
                    FsNode::dir(
                        "web",
                        vec![
                            FsNode::file(
                                "index.html",
                                "<!DOCTYPE html>\n<html>\n<head>\n    <title>My Site</title>\n    <link rel=\"stylesheet\" href=\"style.css\">\n</head>\n<body>\n    <h1>Hello World</h1>\n    <p>My first web page.</p>\n</body>\n</html>",
                            ),
                            FsNode::file(
                                "style.css",
                                "body {\n    font-family: Arial, sans-serif;\n    background: #f0f0f0;\n    color: #333;\n}\n\nh1 {\n    color: #0066cc;\n}",
                            ),
                        ],
                    ),
                    FsNode::dir(
                        "python",
                        vec![
                            FsNode::file(
                                "hello.py",
                                "#!/usr/bin/env python3\n\ndef greet(name):\n    return f\"Hello {name}!\"\n\nif __name__ == \"__main__\":\n    print(greet(\"shell\"))",
                            )
                            .with_mode("rwxr-xr-x"),
                            FsNode::file(
                                "calc.py",
                                "# Tiny calculator\n\ndef add(a, b):\n    return a + b\n\nresult = add(42, 58)\nprint(f\"42 + 58 = {result}\")",
                            )
                            .with_mode("rwxr-xr-x"),
                        ],
                    ),
                ],
            ),
        ],
    );

    let home_user = FsNode::dir(
        "user",
        vec![
            documents,
            FsNode::dir(
                "images",
                vec![
                    FsNode::file("photo1.jpg", "[Binary image: holiday photo - 2.4 MB]"),
                    FsNode::file("photo2.png", "[Binary image: screenshot - 856 KB]"),
                    FsNode::file(
                        "logo.svg",
                        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 100 100\">\n  <circle cx=\"50\" cy=\"50\" r=\"40\" fill=\"#333\"/>\n</svg>",
                    ),
                ],
            ),
            FsNode::dir("music", Vec::new()),
            FsNode::dir(
                "downloads",
                vec![
                    FsNode::file("archive.zip", "[ZIP archive - 15.3 MB]")
                        .with_mtime(now - 10 * DAY_MS),
                    FsNode::file(
                        "readme.md",
                        "# Readme\n\nThis is a documentation file.\n\n## Install\n\n1. Download the file\n2. Extract the archive\n3. Run the program",
                    )
                    .with_mtime(now - 2 * DAY_MS),
                    FsNode::file(
                        "config.json",
                        "{\n    \"name\": \"termgym\",\n    \"version\": \"1.0.0\",\n    \"debug\": false\n}",
                    )
                    .with_mtime(now - 3 * HOUR_MS),
                ],
            ),
            FsNode::file(
                ".bashrc",
                "# ~/.bashrc\n# Shell configuration\n\nalias ll=\"ls -la\"\nalias la=\"ls -a\"\nalias ..=\"cd ..\"\n\nexport PATH=$HOME/bin:$PATH",
            ),
            FsNode::file(
                ".profile",
                "# ~/.profile\n# Executed at login\n\nif [ -f \"$HOME/.bashrc\" ]; then\n    . \"$HOME/.bashrc\"\nfi",
            ),
            FsNode::file(
                ".secret_note",
                "Well done, you found a hidden file!\nFiles starting with a dot (.) are hidden.\nUse \"ls -a\" to see them.",
            ),
        ],
    );

    let etc = FsNode::dir(
        "etc",
        vec![
            FsNode::file("hostname", DEFAULT_HOSTNAME).with_owner("root"),
            FsNode::file(
                "passwd",
                "root:x:0:0:root:/root:/bin/bash\nuser:x:1000:1000:user:/home/user:/bin/bash\nnobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin",
            )
            .with_owner("root")
            .with_mode("rw-r--r--"),
            FsNode::file(
                "os-release",
                "NAME=\"Termgym OS\"\nVERSION=\"1.0\"\nID=termgym\nPRETTY_NAME=\"Termgym OS 1.0\"",
            )
            .with_owner("root"),
            FsNode::file(
                "hosts",
                "127.0.0.1\tlocalhost\n127.0.1.1\ttermgym\n::1\t\tlocalhost",
            )
            .with_owner("root"),
        ],
    )
    .with_owner("root");

    let var = FsNode::dir(
        "var",
        vec![
            FsNode::dir(
                "log",
                vec![
                    FsNode::file(
                        "system.log",
                        "[2024-01-15 08:00:01] System started\n[2024-01-15 08:00:02] Network interface up\n[2024-01-15 08:00:03] SSH service started\n[2024-01-15 08:15:00] User login: user\n[2024-01-15 09:30:45] Warning: disk usage at 75%\n[2024-01-15 10:00:00] Cron job executed\n[2024-01-15 11:22:33] Error: connection timeout to remote server\n[2024-01-15 12:00:00] Backup completed successfully\n[2024-01-15 14:05:12] Warning: high memory usage detected\n[2024-01-15 15:30:00] Package update available",
                    )
                    .with_owner("root")
                    .with_mtime(now - 90 * MINUTE_MS),
                    FsNode::file(
                        "auth.log",
                        "[2024-01-15 08:15:00] Accepted password for user\n[2024-01-15 08:15:01] Session opened for user\n[2024-01-15 09:00:00] Failed password for admin\n[2024-01-15 09:00:05] Failed password for admin\n[2024-01-15 09:00:10] Failed password for admin",
                    )
                    .with_owner("root")
                    .with_mtime(now - 2 * DAY_MS),
                ],
            )
            .with_owner("root"),
        ],
    )
    .with_owner("root");

    let tmp = FsNode::dir(
        "tmp",
        vec![
            FsNode::file(
                "temp_data.txt",
                "Temporary data...\nThis file can be deleted.",
            )
            .with_mtime(now - 30 * MINUTE_MS),
            FsNode::file("cache_old.tmp", "Old cache to clean up.").with_mtime(now - 15 * DAY_MS),
            FsNode::file("session_123.tmp", "Active session: user\nExpires: 2024-02-15")
                .with_mtime(now - 5 * MINUTE_MS),
        ],
    )
    .with_mode("rwxrwxrwx");

    let usr = FsNode::dir(
        "usr",
        vec![
            FsNode::dir("bin", Vec::new()).with_owner("root"),
            FsNode::dir(
                "share",
                vec![FsNode::dir("doc", Vec::new()).with_owner("root")],
            )
            .with_owner("root"),
        ],
    )
    .with_owner("root");

    let mut root = FsNode::dir(
        "/",
        vec![FsNode::dir("home", vec![home_user]), etc, var, tmp, usr],
    );
    stamp_default_mtimes(&mut root, now);
    root
}

/// Give every node without an explicit seed mtime the build instant.
fn stamp_default_mtimes(node: &mut FsNode, now: i64) {
    if node.mtime == 0 {
        node.mtime = now;
    }
    if let Some(children) = node.children_mut() {
        for child in children.values_mut() {
            stamp_default_mtimes(child, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_layout() {
        let root = seed_tree();
        assert!(root.is_dir());
        let user = root.child("home").unwrap().child("user").unwrap();
        assert!(user.child("documents").unwrap().is_dir());
        assert!(user.child(".bashrc").unwrap().is_file());
        assert!(root.child("etc").unwrap().child("passwd").is_some());
        assert!(root.child("tmp").is_some());
    }

    #[test]
    fn test_seed_ownership_and_modes() {
        let root = seed_tree();
        let etc = root.child("etc").unwrap();
        assert_eq!(etc.owner, "root");
        let bonuses = root
            .child("home")
            .unwrap()
            .child("user")
            .unwrap()
            .child("documents")
            .unwrap()
            .child("bonuses.txt")
            .unwrap();
        assert_eq!(bonuses.mode.to_string(), "rw-rw----");
        assert_eq!(bonuses.group, "hr");
        assert_eq!(
            root.child("tmp").unwrap().mode.to_string(),
            "rwxrwxrwx"
        );
    }

    #[test]
    fn test_seed_mtimes_are_stamped() {
        let root = seed_tree();
        let downloads = root
            .child("home")
            .unwrap()
            .child("user")
            .unwrap()
            .child("downloads")
            .unwrap();
        let archive = downloads.child("archive.zip").unwrap();
        let readme = downloads.child("readme.md").unwrap();
        assert!(archive.mtime < readme.mtime);
        // Nodes without explicit ages get the build instant.
        assert!(downloads.mtime > readme.mtime);
    }
}

mod command;
mod mailbox;

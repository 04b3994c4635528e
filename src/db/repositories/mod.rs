mod drawings;
mod settings;
